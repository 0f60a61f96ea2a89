//! The playing agent: belief tracking wired to the game-turn protocol.
//!
//! The belief engine always reasons in a canonical frame where the agent owns
//! the White pieces. An agent seated as Black mirrors every inbound square,
//! move, and sense result into that frame and mirrors its choices back out,
//! so one engine serves both seats.

use crate::policy::Policy;
use chess::{Board, BoardBuilder, ChessMove, Color, MoveGen, Piece, Square};
use recon_core::belief::{BeliefGrid, CandidateMove, SenseObservation};
use recon_core::model::geometry::{file_of, mirror_move, mirror_square};
use tracing::{debug, warn};

const DEFAULT_SAMPLES: usize = 12;

pub struct FogAgent<P> {
    seat: Color,
    belief: BeliefGrid,
    policy: P,
    samples: usize,
}

/// The starting board as seen from `seat`'s canonical frame. White keeps the
/// real board; Black gets the 180°-rotated, color-swapped start, so that the
/// same mirroring applied to every subsequent square and move keeps the frame
/// self-consistent.
fn frame_start(seat: Color) -> Board {
    match seat {
        Color::White => Board::default(),
        Color::Black => {
            let real = Board::default();
            let mut builder = BoardBuilder::new();
            for square in chess::ALL_SQUARES {
                if let (Some(piece), Some(color)) = (real.piece_on(square), real.color_on(square)) {
                    builder[mirror_square(square)] = Some((piece, !color));
                }
            }
            Board::try_from(&builder).expect("rotated start position is valid")
        }
    }
}

impl<P: Policy> FogAgent<P> {
    /// Creates an agent for `seat` with a fully-certain starting belief.
    pub fn new(seat: Color, policy: P, seed: u64) -> Self {
        Self {
            seat,
            belief: BeliefGrid::with_seed(&frame_start(seat), seed),
            policy,
            samples: DEFAULT_SAMPLES,
        }
    }

    /// Number of concrete boards drawn per move decision.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    pub fn seat(&self) -> Color {
        self.seat
    }

    pub fn belief(&self) -> &BeliefGrid {
        &self.belief
    }

    pub fn estimated_states(&self) -> u128 {
        self.belief.estimated_state_count()
    }

    /// Feeds an opponent-move notification into the belief state. Candidate
    /// moves are `(move, piece class, chance)` in real board coordinates.
    pub fn handle_opponent_move(
        &mut self,
        candidates: &[(ChessMove, Piece, f64)],
        captured_own_piece: bool,
        capture_square: Option<Square>,
    ) {
        let list: Vec<CandidateMove> = candidates
            .iter()
            .map(|&(mv, class, chance)| CandidateMove::new(self.to_frame_move(mv), class, chance))
            .collect();
        let square = capture_square.map(|sq| self.to_frame_square(sq));
        self.belief.handle_opponent_move(list, captured_own_piece, square);
        debug!(
            seat = ?self.seat,
            captured_own_piece,
            states = %self.belief.estimated_state_count(),
            "opponent move processed"
        );
    }

    /// Picks the next 3×3 sense center, in real board coordinates.
    pub fn choose_sense(&self) -> Square {
        self.from_frame_square(self.belief.choose_sense())
    }

    /// Consumes the ground truth revealed by a sense action.
    pub fn handle_sense_result(&mut self, result: &[(Square, Option<(Piece, Color)>)]) {
        let framed: Vec<SenseObservation> = result
            .iter()
            .map(|&(square, occupant)| {
                let occupant = occupant.map(|(piece, color)| (piece, self.to_frame_color(color)));
                (self.to_frame_square(square), occupant)
            })
            .collect();
        self.belief.handle_sense_result(&framed);
    }

    /// Chooses a move by sampling concrete boards and scoring each legal
    /// move's successors with the policy. Returns `None` (a pass) when no
    /// sampled board can be realized.
    pub fn choose_move(&mut self) -> Option<ChessMove> {
        let mut boards = Vec::with_capacity(self.samples);
        for _ in 0..self.samples {
            let sample = self.belief.sample_board();
            if !sample.skipped.is_empty() {
                warn!(
                    seat = ?self.seat,
                    skipped = sample.skipped.len(),
                    "sampled board left slots unplaced"
                );
            }
            if let Ok(board) = Board::try_from(&sample.board) {
                boards.push(board);
            }
        }
        if boards.is_empty() {
            warn!(seat = ?self.seat, "no sampled board was realizable; passing");
            return None;
        }

        let mut best: Option<(ChessMove, f64)> = None;
        for mv in MoveGen::new_legal(&boards[0]) {
            if is_castle(&boards[0], mv) {
                continue;
            }
            let successors: Vec<Board> = boards
                .iter()
                .filter(|board| board.legal(mv))
                .map(|board| board.make_move_new(mv))
                .collect();
            if successors.is_empty() {
                continue;
            }
            let scores = self.policy.score_boards(&successors);
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            if best.map_or(true, |(_, score)| mean > score) {
                best = Some((mv, mean));
            }
        }

        let chosen = best.map(|(mv, _)| self.from_frame_move(mv));
        debug!(seat = ?self.seat, chosen = ?chosen.map(|m| m.to_string()), "move selected");
        chosen
    }

    /// Records the agent's own completed move (or pass).
    pub fn handle_own_move(&mut self, mv: Option<ChessMove>, captured_enemy_piece: bool) {
        self.belief
            .handle_own_move(mv.map(|m| self.to_frame_move(m)), captured_enemy_piece);
    }

    /// Near-certain squares in real board coordinates, for diagnostics.
    pub fn certain_squares(&self) -> Vec<(Square, Piece, Color)> {
        let projection = self.belief.certain_projection();
        chess::ALL_SQUARES
            .iter()
            .filter_map(|&square| {
                projection[square].map(|(piece, color)| {
                    (
                        self.from_frame_square(square),
                        piece,
                        self.from_frame_color(color),
                    )
                })
            })
            .collect()
    }

    fn to_frame_square(&self, square: Square) -> Square {
        match self.seat {
            Color::White => square,
            Color::Black => mirror_square(square),
        }
    }

    fn from_frame_square(&self, square: Square) -> Square {
        self.to_frame_square(square)
    }

    fn to_frame_move(&self, mv: ChessMove) -> ChessMove {
        match self.seat {
            Color::White => mv,
            Color::Black => mirror_move(mv),
        }
    }

    fn from_frame_move(&self, mv: ChessMove) -> ChessMove {
        self.to_frame_move(mv)
    }

    fn to_frame_color(&self, color: Color) -> Color {
        match self.seat {
            Color::White => color,
            Color::Black => !color,
        }
    }

    fn from_frame_color(&self, color: Color) -> Color {
        self.to_frame_color(color)
    }
}

/// Castling moves the rook as a side effect the own-move updater does not
/// model, so the agent never plays them.
fn is_castle(board: &Board, mv: ChessMove) -> bool {
    board.piece_on(mv.get_source()) == Some(Piece::King)
        && file_of(mv.get_source()).abs_diff(file_of(mv.get_dest())) == 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RandomPolicy;
    use std::str::FromStr;

    fn sq(text: &str) -> Square {
        Square::from_str(text).unwrap()
    }

    #[test]
    fn white_agent_chooses_a_legal_opening_move() {
        let mut agent = FogAgent::new(Color::White, RandomPolicy::new(3), 3);
        let mv = agent.choose_move().expect("an opening move exists");
        assert!(Board::default().legal(mv));
    }

    #[test]
    fn black_agent_mirrors_choices_into_real_coordinates() {
        let mut agent = FogAgent::new(Color::Black, RandomPolicy::new(3), 3);
        // From Black's canonical frame every sampled opening is the start
        // position; the unmirrored move must be legal for Black on the real
        // board after some White move.
        let board = Board::default()
            .make_move_new(ChessMove::new(sq("e2"), sq("e4"), None));
        let mv = agent.choose_move().expect("a reply exists");
        assert!(board.legal(mv), "move {mv} should be legal for black");
    }

    #[test]
    fn black_agent_frames_sense_results() {
        let mut agent = FogAgent::new(Color::Black, RandomPolicy::new(3), 3);
        // White knight observed on f3 — mirrored into the canonical frame it
        // is an enemy knight on c6.
        agent.handle_sense_result(&[(sq("f3"), Some((Piece::Knight, Color::White)))]);
        assert_eq!(agent.belief().mass(1, sq("c6")), 1.0);
    }

    #[test]
    fn full_turn_cycle_runs_both_seats() {
        let mut white = FogAgent::new(Color::White, RandomPolicy::new(1), 1);
        let mut black = FogAgent::new(Color::Black, RandomPolicy::new(2), 2);

        let opening = ChessMove::new(sq("e2"), sq("e4"), None);
        white.handle_own_move(Some(opening), false);

        black.handle_opponent_move(&[(opening, Piece::Pawn, 1.0)], false, None);
        let sense = black.choose_sense();
        let truth = Board::default().make_move_new(opening);
        let window: Vec<(Square, Option<(Piece, Color)>)> = vec![(
            sense,
            truth
                .piece_on(sense)
                .and_then(|p| truth.color_on(sense).map(|c| (p, c))),
        )];
        black.handle_sense_result(&window);

        let reply = black.choose_move().expect("black can reply");
        assert!(truth.legal(reply));
        black.handle_own_move(Some(reply), false);
        assert!(black.estimated_states() >= 1);
    }

    #[test]
    fn certain_squares_report_real_coordinates() {
        let agent = FogAgent::new(Color::Black, RandomPolicy::new(1), 1);
        let squares = agent.certain_squares();
        assert_eq!(squares.len(), 32);
        assert!(
            squares
                .iter()
                .any(|&(square, piece, color)| square == sq("e8")
                    && piece == Piece::King
                    && color == Color::Black)
        );
    }
}
