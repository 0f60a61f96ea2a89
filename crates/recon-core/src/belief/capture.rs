//! Reachability-based inference for "one of our pieces just vanished".

use super::grid::BeliefGrid;
use super::{CAPTURE_SPIKE, MASS_EPSILON};
use crate::model::geometry::{DIAGONAL_DIRS, STRAIGHT_DIRS, KNIGHT_OFFSETS, offset, rank_of, file_of, square_at};
use crate::model::slot::{NUM_SLOTS, SLOTS_PER_SIDE, SlotId, is_pawn_slot, slot_class};
use chess::{BoardBuilder, Piece, Square};

impl BeliefGrid {
    /// Updates the belief after the opponent captured one of our pieces at
    /// `square` without us observing the move itself.
    ///
    /// Builds a per-slot "capture chance" from geometric reachability against
    /// the certain-board projection, falling back to a uniform spread over
    /// plausible slots when nothing reaches, then teleports mass onto the
    /// capture square in proportion to those chances.
    pub(super) fn infer_capture(&mut self, square: Square) {
        let (rank, file) = (rank_of(square), file_of(square));

        // The victim is whichever of our slots is most concentrated there.
        let victim = self.argmax_slot_at(SLOTS_PER_SIDE..NUM_SLOTS, rank, file);
        self.mark_captured(victim, Vec::new());

        let occlusion = self.certain_projection();
        let mut chances = [0.0_f64; SLOTS_PER_SIDE];
        for slot in 0..SLOTS_PER_SIDE {
            if !self.is_alive(slot) {
                continue;
            }
            chances[slot] = self.reach_mass(slot, &occlusion, rank, file);
        }

        let total: f64 = chances.iter().sum();
        if total > MASS_EPSILON {
            for chance in &mut chances {
                *chance /= total;
            }
        } else {
            // Nothing reaches under current certainty: spread evenly over the
            // slots that could plausibly have done it, and flag the square
            // for priority sensing.
            let pool: Vec<SlotId> = (0..SLOTS_PER_SIDE)
                .filter(|&slot| self.is_alive(slot) && slot_class(slot) != Piece::King)
                .filter(|&slot| !is_pawn_slot(slot) || self.pawn_files[slot].touches_adjacent(file))
                .collect();
            if !pool.is_empty() {
                let share = 1.0 / pool.len() as f64;
                for slot in pool {
                    chances[slot] = share;
                }
            }
            self.base_uncertainty[rank][file] = CAPTURE_SPIKE;
        }

        for slot in 0..NUM_SLOTS {
            if slot < SLOTS_PER_SIDE && self.is_alive(slot) {
                let chance = chances[slot];
                for r in 0..8 {
                    for f in 0..8 {
                        if (r, f) != (rank, file) {
                            self.planes[slot][r][f] *= 1.0 - chance;
                        }
                    }
                }
                self.planes[slot][rank][file] = chance;
                if chance > 0.0 && is_pawn_slot(slot) {
                    self.pawn_files[slot].insert(file);
                }
            } else {
                // Slots not under consideration cannot be standing on the
                // capture square.
                self.planes[slot][rank][file] = 0.0;
            }
        }
        self.normalize();
    }

    /// Probability mass `slot` holds on squares from which it could have
    /// captured on `(rank, file)`, respecting occlusion.
    fn reach_mass(&self, slot: SlotId, occlusion: &BoardBuilder, rank: usize, file: usize) -> f64 {
        let class = slot_class(slot);
        let mut reach = 0.0;

        if matches!(class, Piece::Rook | Piece::Queen) {
            for (dr, df) in STRAIGHT_DIRS {
                reach += self.ray_mass(slot, occlusion, rank, file, dr, df);
            }
        }
        if matches!(class, Piece::Bishop | Piece::Queen) {
            for (dr, df) in DIAGONAL_DIRS {
                reach += self.ray_mass(slot, occlusion, rank, file, dr, df);
            }
        }
        if class == Piece::Knight {
            for (dr, df) in KNIGHT_OFFSETS {
                if let Some((r, f)) = offset(rank, file, dr, df) {
                    if occlusion[square_at(r, f)].is_none() {
                        reach += self.planes[slot][r][f];
                    }
                }
            }
        }
        if class == Piece::Pawn {
            // Enemy pawns advance toward rank 0, so a capture here came from
            // the rank above, one file over — and only from a column this
            // pawn is tracked on.
            for df in [-1, 1] {
                if let Some((r, f)) = offset(rank, file, 1, df) {
                    if self.pawn_files[slot].contains(f) {
                        reach += self.planes[slot][r][f];
                    }
                }
            }
        }

        reach
    }

    /// Walks outward from the capture square (inclusive), accumulating the
    /// slot's mass until the first square occupied on the projection.
    fn ray_mass(
        &self,
        slot: SlotId,
        occlusion: &BoardBuilder,
        rank: usize,
        file: usize,
        dr: i32,
        df: i32,
    ) -> f64 {
        let mut acc = 0.0;
        let (mut r, mut f) = (rank, file);
        loop {
            if occlusion[square_at(r, f)].is_some() {
                break;
            }
            acc += self.planes[slot][r][f];
            match offset(r, f, dr, df) {
                Some(next) => (r, f) = next,
                None => break,
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::CandidateMove;
    use chess::{Board, ChessMove};
    use std::str::FromStr;

    fn sq(text: &str) -> Square {
        Square::from_str(text).unwrap()
    }

    #[test]
    fn uncertain_rook_on_open_ray_takes_all_blame() {
        // White pawn on e4, white king e1, black rook e2, black king e8.
        let board = Board::from_str("4k3/8/8/8/4P3/8/4r3/4K3 w - - 0 1").unwrap();
        let mut grid = BeliefGrid::with_seed(&board, 1);

        // Smear the rook between e2 and d2 so it drops off the certain board.
        grid.handle_opponent_move(
            vec![CandidateMove::new(
                ChessMove::new(sq("e2"), sq("d2"), None),
                Piece::Rook,
                0.5,
            )],
            false,
            None,
        );

        // Our e4 pawn vanishes; only the rook's vertical ray reaches it.
        grid.handle_opponent_move(Vec::new(), true, Some(sq("e4")));

        assert!((grid.mass(0, sq("e4")) - 1.0).abs() < 1e-9);
        assert_eq!(grid.mass(0, sq("e2")), 0.0);
        assert!(!grid.is_alive(24)); // our only pawn slot
        grid.assert_invariants();
    }

    #[test]
    fn certain_pieces_occlude_reachability_rays() {
        // As above, but the rook stays certain on e2: the projection blocks
        // its own ray, so inference falls back to the uniform pool.
        let board = Board::from_str("4k3/8/8/8/4P3/8/4r3/4K3 w - - 0 1").unwrap();
        let mut grid = BeliefGrid::with_seed(&board, 1);
        grid.handle_opponent_move(Vec::new(), true, Some(sq("e4")));

        // Pool is just the rook (the king is excluded, everything else is
        // captured-unknown), so it still takes the blame — but the square is
        // flagged for priority sensing.
        assert!((grid.mass(0, sq("e4")) - 1.0).abs() < 1e-9);
        assert_eq!(grid.base_uncertainty_at(sq("e4")), crate::belief::CAPTURE_SPIKE);
        grid.assert_invariants();
    }

    #[test]
    fn fallback_excludes_column_inconsistent_pawns() {
        let mut grid = BeliefGrid::with_seed(&Board::default(), 1);
        // Our e2 pawn vanishes. Nothing reaches it geometrically from the
        // start position, so the fallback pool is the seven non-king pieces
        // plus the d- and f-pawns.
        grid.handle_opponent_move(Vec::new(), true, Some(sq("e2")));

        let e2 = sq("e2");
        let share = 1.0 / 9.0;
        for slot in [0, 1, 2, 3, 5, 6, 7, 11, 13] {
            assert!((grid.mass(slot, e2) - share).abs() < 1e-9, "slot {slot}");
        }
        for slot in [4, 8, 9, 10, 12, 14, 15] {
            assert_eq!(grid.mass(slot, e2), 0.0, "slot {slot}");
        }
        assert_eq!(grid.base_uncertainty_at(e2), CAPTURE_SPIKE);

        // Capture evidence implicates the e-file for the blamed pawns.
        assert!(grid.pawn_files(11).contains(4));
        assert!(grid.pawn_files(13).contains(4));
        grid.assert_invariants();
    }

    #[test]
    fn knight_reach_requires_empty_offset_square() {
        // Black knight smeared over g4/h4; capture at e3. Only g4 is a
        // knight's jump from e3.
        let board = Board::from_str("4k3/8/8/8/6n1/8/8/2B1K3 w - - 0 1").unwrap();
        let mut grid = BeliefGrid::with_seed(&board, 1);
        grid.handle_opponent_move(
            vec![CandidateMove::new(
                ChessMove::new(sq("g4"), sq("h4"), None),
                Piece::Knight,
                0.5,
            )],
            false,
            None,
        );

        // Our bishop walks to e3 first (own-move bookkeeping), then vanishes.
        grid.handle_own_move(Some(ChessMove::new(sq("c1"), sq("e3"), None)), false);
        grid.handle_opponent_move(Vec::new(), true, Some(sq("e3")));

        // The knight's g4 half reaches; its h4 half does not, so inference
        // still pins the capture on the knight slot.
        assert!((grid.mass(1, sq("e3")) - 1.0).abs() < 1e-9);
        grid.assert_invariants();
    }
}
