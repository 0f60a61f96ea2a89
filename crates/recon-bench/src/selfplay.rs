//! Local fog-of-war matches between two belief-tracking agents.
//!
//! The runner is the arbiter: it holds the true board, hands each side its
//! move notifications, candidate lists, and 3×3 sense windows, and validates
//! requested moves. Agents never see the true board directly.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use recon_bot::{FogAgent, RandomPolicy};
use recon_core::model::geometry::{file_of, offset, rank_of, square_at};
use serde::Serialize;
use tracing::info;

use crate::analytics::{SummaryStats, summarize};
use crate::config::{ResolvedOutputs, RunConfig};

/// One JSONL row per ply.
#[derive(Debug, Serialize)]
pub struct TurnRecord {
    pub game: usize,
    pub turn: usize,
    pub side: &'static str,
    pub sense: String,
    pub mv: String,
    pub capture: bool,
    pub entropy_bits: f64,
}

/// Aggregated outcome of a run.
#[derive(Debug)]
pub struct MatchSummary {
    pub games_played: usize,
    pub turns_total: usize,
    pub jsonl_path: PathBuf,
    pub final_entropy: Option<SummaryStats>,
    pub certain_precision: Option<SummaryStats>,
}

pub struct MatchRunner {
    config: RunConfig,
    outputs: ResolvedOutputs,
}

impl MatchRunner {
    pub fn new(config: RunConfig, outputs: ResolvedOutputs) -> Self {
        Self { config, outputs }
    }

    pub fn run(&self) -> Result<MatchSummary> {
        if let Some(parent) = self.outputs.jsonl.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
        let file = File::create(&self.outputs.jsonl)
            .with_context(|| format!("creating {}", self.outputs.jsonl.display()))?;
        let mut writer = BufWriter::new(file);

        let base_seed = self.config.play.seed.unwrap_or(0);
        let mut turns_total = 0;
        let mut entropy_series = Vec::new();
        let mut precision_series = Vec::new();

        for game in 0..self.config.play.games {
            let outcome = self.play_game(game, base_seed, &mut writer)?;
            turns_total += outcome.turns;
            entropy_series.extend(outcome.final_entropy);
            precision_series.extend(outcome.certain_precision);
            info!(game, turns = outcome.turns, "game finished");
        }
        writer.flush().context("flushing turn log")?;

        Ok(MatchSummary {
            games_played: self.config.play.games,
            turns_total,
            jsonl_path: self.outputs.jsonl.clone(),
            final_entropy: summarize(&entropy_series),
            certain_precision: summarize(&precision_series),
        })
    }

    fn play_game(
        &self,
        game: usize,
        base_seed: u64,
        writer: &mut BufWriter<File>,
    ) -> Result<GameOutcome> {
        let seed = base_seed.wrapping_add(game as u64 * 1000);
        let samples = self.config.play.samples;
        let mut white = FogAgent::new(Color::White, RandomPolicy::new(seed + 1), seed + 2)
            .with_samples(samples);
        let mut black = FogAgent::new(Color::Black, RandomPolicy::new(seed + 3), seed + 4)
            .with_samples(samples);
        let mut arbiter_rng = SmallRng::seed_from_u64(seed + 5);

        let mut board = Board::default();
        let mut pending: Option<Notification> = None;
        let mut turns = 0;

        for turn in 0..self.config.play.max_turns {
            if board.status() != BoardStatus::Ongoing {
                break;
            }
            let side = board.side_to_move();
            let agent = match side {
                Color::White => &mut white,
                Color::Black => &mut black,
            };

            if let Some(notice) = pending.take() {
                agent.handle_opponent_move(
                    &notice.candidates,
                    notice.captured,
                    notice.capture_square,
                );
            }

            let sense = agent.choose_sense();
            agent.handle_sense_result(&sense_window(&board, sense));

            let requested = agent.choose_move();
            let mv = match requested {
                Some(mv) if board.legal(mv) => mv,
                // The arbiter adjusts unplayable requests to a random plain
                // legal move, recon-style, and tells the agent what actually
                // happened.
                _ => match random_plain_move(&board, &mut arbiter_rng) {
                    Some(mv) => mv,
                    None => break,
                },
            };

            let capture = capture_of(&board, mv);
            let candidates = candidate_list(&board);
            board = board.make_move_new(mv);
            agent.handle_own_move(Some(mv), capture.is_some());

            let record = TurnRecord {
                game,
                turn,
                side: side_name(side),
                sense: sense.to_string(),
                mv: mv.to_string(),
                capture: capture.is_some(),
                entropy_bits: agent.belief().entropy_bits(),
            };
            serde_json::to_writer(&mut *writer, &record).context("writing turn record")?;
            writer.write_all(b"\n").context("writing turn record")?;

            pending = Some(Notification {
                candidates,
                captured: capture.is_some(),
                capture_square: capture,
            });
            turns += 1;
        }

        Ok(GameOutcome {
            turns,
            final_entropy: vec![
                white.belief().entropy_bits(),
                black.belief().entropy_bits(),
            ],
            certain_precision: vec![
                certain_precision(&white, &board),
                certain_precision(&black, &board),
            ],
        })
    }
}

struct GameOutcome {
    turns: usize,
    final_entropy: Vec<f64>,
    certain_precision: Vec<f64>,
}

struct Notification {
    candidates: Vec<(ChessMove, Piece, f64)>,
    captured: bool,
    capture_square: Option<Square>,
}

fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

/// The true contents of the 3×3 window centered on `center`.
pub fn sense_window(board: &Board, center: Square) -> Vec<(Square, Option<(Piece, Color)>)> {
    let mut window = Vec::with_capacity(9);
    for dr in -1..=1 {
        for df in -1..=1 {
            if let Some((rank, file)) = offset(rank_of(center), file_of(center), dr, df) {
                let square = square_at(rank, file);
                let occupant = board
                    .piece_on(square)
                    .and_then(|piece| board.color_on(square).map(|color| (piece, color)));
                window.push((square, occupant));
            }
        }
    }
    window
}

/// Every legal move for the side to move, uniformly weighted and tagged with
/// its mover's piece class — the arbiter's candidate list for the opponent's
/// next notification.
fn candidate_list(board: &Board) -> Vec<(ChessMove, Piece, f64)> {
    let moves: Vec<ChessMove> = MoveGen::new_legal(board).collect();
    if moves.is_empty() {
        return Vec::new();
    }
    let chance = 1.0 / moves.len() as f64;
    moves
        .into_iter()
        .filter_map(|mv| {
            board
                .piece_on(mv.get_source())
                .map(|piece| (mv, piece, chance))
        })
        .collect()
}

/// Square of the piece removed by `mv`, if any (en passant included).
fn capture_of(board: &Board, mv: ChessMove) -> Option<Square> {
    if board.piece_on(mv.get_dest()).is_some() {
        return Some(mv.get_dest());
    }
    let is_en_passant = board.piece_on(mv.get_source()) == Some(Piece::Pawn)
        && file_of(mv.get_source()) != file_of(mv.get_dest());
    if is_en_passant {
        Some(square_at(rank_of(mv.get_source()), file_of(mv.get_dest())))
    } else {
        None
    }
}

fn is_castle(board: &Board, mv: ChessMove) -> bool {
    board.piece_on(mv.get_source()) == Some(Piece::King)
        && file_of(mv.get_source()).abs_diff(file_of(mv.get_dest())) == 2
}

/// Uniform pick among legal moves, preferring ones without castling or en
/// passant side effects the belief updater does not model.
fn random_plain_move(board: &Board, rng: &mut SmallRng) -> Option<ChessMove> {
    let all: Vec<ChessMove> = MoveGen::new_legal(board).collect();
    if all.is_empty() {
        return None;
    }
    let plain: Vec<ChessMove> = all
        .iter()
        .copied()
        .filter(|&mv| !is_castle(board, mv) && !is_side_effect_capture(board, mv))
        .collect();
    let pool = if plain.is_empty() { &all } else { &plain };
    Some(pool[rng.gen_range(0..pool.len())])
}

fn is_side_effect_capture(board: &Board, mv: ChessMove) -> bool {
    matches!(capture_of(board, mv), Some(square) if square != mv.get_dest())
}

/// Fraction of the agent's near-certain enemy squares that match the true
/// board. An agent with no certain enemy squares scores a vacuous 1.0.
fn certain_precision(agent: &FogAgent<RandomPolicy>, board: &Board) -> f64 {
    let entries: Vec<_> = agent
        .certain_squares()
        .into_iter()
        .filter(|&(_, _, color)| color != agent.seat())
        .collect();
    if entries.is_empty() {
        return 1.0;
    }
    let correct = entries
        .iter()
        .filter(|&&(square, piece, color)| {
            board.piece_on(square) == Some(piece) && board.color_on(square) == Some(color)
        })
        .count();
    correct as f64 / entries.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sense_window_clips_at_the_edge() {
        let board = Board::default();
        let corner = Square::from_str("a1").unwrap();
        let window = sense_window(&board, corner);
        assert_eq!(window.len(), 4);
        assert!(window.iter().any(|&(sq, occ)| {
            sq == Square::from_str("b2").unwrap() && occ == Some((Piece::Pawn, Color::White))
        }));
    }

    #[test]
    fn candidate_list_is_uniform_over_legal_moves() {
        let board = Board::default();
        let candidates = candidate_list(&board);
        assert_eq!(candidates.len(), 20);
        let total: f64 = candidates.iter().map(|&(_, _, chance)| chance).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(
            candidates
                .iter()
                .all(|&(_, piece, _)| matches!(piece, Piece::Pawn | Piece::Knight))
        );
    }

    #[test]
    fn en_passant_capture_square_is_the_bypassed_pawn() {
        // White pawn e5, black just played d7d5.
        let board =
            Board::from_str("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();
        let mv = ChessMove::new(
            Square::from_str("e5").unwrap(),
            Square::from_str("d6").unwrap(),
            None,
        );
        assert_eq!(capture_of(&board, mv), Some(Square::from_str("d5").unwrap()));
    }

    #[test]
    fn plain_capture_square_is_the_destination() {
        let board = Board::default();
        // Not a legal move, but capture_of only inspects occupancy.
        let mv = ChessMove::new(
            Square::from_str("a1").unwrap(),
            Square::from_str("a7").unwrap(),
            None,
        );
        assert_eq!(capture_of(&board, mv), Some(Square::from_str("a7").unwrap()));
    }
}
