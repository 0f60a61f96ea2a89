//! Concrete-board determinization: drawing one fully-specified board
//! consistent with the current beliefs.

use super::grid::BeliefGrid;
use super::{MASS_EPSILON, PROJECTION_THRESHOLD};
use crate::model::geometry::square_at;
use crate::model::slot::{NUM_SLOTS, SlotId, slot_class, slot_color};
use chess::BoardBuilder;
use rand::Rng;

/// Placement order: kings, queens and the major pieces before pawns,
/// interleaved across sides, to minimize claim conflicts.
pub const SAMPLE_ORDER: [SlotId; NUM_SLOTS] = [
    20, 4, 19, 3, 23, 7, 16, 0, 22, 6, 17, 1, 21, 5, 18, 2, // royals and majors
    24, 8, 25, 9, 26, 10, 27, 11, 28, 12, 29, 13, 30, 14, 31, 15, // pawns
];

/// One determinized board plus sampling diagnostics.
///
/// `skipped` lists slots whose remaining mass sat entirely on already-claimed
/// squares — a recoverable anomaly, surfaced rather than swallowed.
/// `log_weight` sums the log-probabilities of the draws, for importance
/// weighting downstream.
#[derive(Clone)]
pub struct SampledBoard {
    pub board: BoardBuilder,
    pub skipped: Vec<SlotId>,
    pub log_weight: f64,
}

impl std::fmt::Debug for SampledBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampledBoard")
            .field("board", &format_args!("{}", self.board))
            .field("skipped", &self.skipped)
            .field("log_weight", &self.log_weight)
            .finish()
    }
}

impl BeliefGrid {
    /// Draws one concrete board from the belief distribution.
    pub fn sample_board(&mut self) -> SampledBoard {
        let mut builder = BoardBuilder::new();
        let mut claimed = [[false; 8]; 8];
        let mut skipped = Vec::new();
        let mut log_weight = 0.0_f64;

        for &slot in SAMPLE_ORDER.iter() {
            if self.slot_mass_total(slot) < MASS_EPSILON {
                continue; // captured, or nothing to place
            }

            let mut plane = self.planes[slot];
            for rank in 0..8 {
                for file in 0..8 {
                    if claimed[rank][file] {
                        plane[rank][file] = 0.0;
                    }
                }
            }
            let total: f64 = plane.iter().flatten().sum();
            if total < MASS_EPSILON {
                skipped.push(slot);
                continue;
            }

            let mut draw = self.rng.gen_range(0.0..total);
            let mut pick = None;
            let mut last_positive = (0, 0, 0.0);
            'search: for rank in 0..8 {
                for file in 0..8 {
                    let weight = plane[rank][file];
                    if weight <= 0.0 {
                        continue;
                    }
                    last_positive = (rank, file, weight);
                    if draw <= weight {
                        pick = Some((rank, file, weight));
                        break 'search;
                    }
                    draw -= weight;
                }
            }
            // Rounding can exhaust the scan; fall back to the last live cell.
            let (rank, file, weight) = pick.unwrap_or(last_positive);

            builder[square_at(rank, file)] = Some((slot_class(slot), slot_color(slot)));
            claimed[rank][file] = true;
            log_weight += (weight / total).ln();
        }

        SampledBoard {
            board: builder,
            skipped,
            log_weight,
        }
    }

    /// Occlusion projection: only slots whose peak mass exceeds the
    /// near-certainty threshold are placed. Used for reachability and
    /// king-safety scans, never handed to search.
    pub fn certain_projection(&self) -> BoardBuilder {
        let mut builder = BoardBuilder::new();
        for slot in 0..NUM_SLOTS {
            let (rank, file, peak) = self.peak_square(slot);
            if peak > PROJECTION_THRESHOLD {
                builder[square_at(rank, file)] = Some((slot_class(slot), slot_color(slot)));
            }
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::CandidateMove;
    use chess::{ALL_SQUARES, Board, ChessMove, Piece, Square};
    use std::str::FromStr;

    fn sq(text: &str) -> Square {
        Square::from_str(text).unwrap()
    }

    #[test]
    fn fully_certain_belief_samples_the_true_board() {
        let start = Board::default();
        let mut grid = BeliefGrid::with_seed(&start, 9);
        let sample = grid.sample_board();

        assert!(sample.skipped.is_empty());
        assert!(sample.log_weight.abs() < 1e-12);
        for square in ALL_SQUARES {
            let truth = start
                .piece_on(square)
                .and_then(|p| start.color_on(square).map(|c| (p, c)));
            assert_eq!(sample.board[square], truth, "square {square}");
        }
    }

    #[test]
    fn sampling_is_deterministic_under_a_fixed_seed() {
        let mut a = BeliefGrid::with_seed(&Board::default(), 42);
        let mut b = BeliefGrid::with_seed(&Board::default(), 42);
        let spread = vec![
            CandidateMove::new(ChessMove::new(sq("b8"), sq("c6"), None), Piece::Knight, 0.5),
            CandidateMove::new(ChessMove::new(sq("d7"), sq("d5"), None), Piece::Pawn, 0.5),
        ];
        a.handle_opponent_move(spread.clone(), false, None);
        b.handle_opponent_move(spread, false, None);

        let sample_a = a.sample_board();
        let sample_b = b.sample_board();
        for square in ALL_SQUARES {
            assert_eq!(sample_a.board[square], sample_b.board[square]);
        }
        assert_eq!(sample_a.log_weight, sample_b.log_weight);
    }

    #[test]
    fn crowded_out_slot_is_surfaced_not_swallowed() {
        let mut grid = BeliefGrid::with_seed(&Board::default(), 3);
        // Force the queen's knight's whole plane onto e1, which our own king
        // (placed first in the priority order) always claims.
        grid.apply_move_distribution(&[CandidateMove::new(
            ChessMove::new(sq("b8"), sq("e1"), None),
            Piece::Knight,
            1.0,
        )]);

        let sample = grid.sample_board();
        assert_eq!(sample.skipped, vec![1]);
        assert_eq!(sample.board[sq("e1")], Some((Piece::King, chess::Color::White)));
    }

    #[test]
    fn projection_only_places_near_certain_slots() {
        let mut grid = BeliefGrid::with_seed(&Board::default(), 3);
        grid.handle_opponent_move(
            vec![CandidateMove::new(
                ChessMove::new(sq("g8"), sq("f6"), None),
                Piece::Knight,
                0.5,
            )],
            false,
            None,
        );

        let projection = grid.certain_projection();
        assert_eq!(projection[sq("g8")], None);
        assert_eq!(projection[sq("f6")], None);
        assert_eq!(projection[sq("b8")], Some((Piece::Knight, chess::Color::Black)));
        assert_eq!(projection[sq("e1")], Some((Piece::King, chess::Color::White)));
    }
}
