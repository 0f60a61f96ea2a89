//! The sense-targeting heat map: where is the board least known, and where
//! could an unseen attack on our king be hiding?

use super::grid::BeliefGrid;
use super::{KING_ATTACK, PIECE_PIN};
use crate::model::geometry::{
    DIAGONAL_DIRS, KNIGHT_OFFSETS, STRAIGHT_DIRS, offset, square_at,
};
use crate::model::slot::{NUM_SLOTS, OWN_KING, SLOTS_PER_SIDE, slot_class};
use chess::{Piece, Square};

impl BeliefGrid {
    /// Per-square uncertainty, collapsed across slots.
    ///
    /// The base score `0.5 − |0.5 − mass|` peaks where a slot is maximally
    /// undecided. King-safety bonuses mark empty squares an unseen enemy
    /// knight or slider could be attacking (or pinning) from, and the
    /// staleness and base-uncertainty biases are added last.
    pub fn board_uncertainty(&self) -> [[f64; 8]; 8] {
        let mut per_slot = [[[0.0_f64; NUM_SLOTS]; 8]; 8];
        for slot in 0..NUM_SLOTS {
            for rank in 0..8 {
                for file in 0..8 {
                    per_slot[rank][file][slot] = 0.5 - (0.5 - self.planes[slot][rank][file]).abs();
                }
            }
        }

        let occlusion = self.certain_projection();
        let occupied = |rank: usize, file: usize| occlusion[square_at(rank, file)].is_some();
        let (king_rank, king_file, _) = self.peak_square(OWN_KING);

        // Squares a knight could check from.
        for (dr, df) in KNIGHT_OFFSETS {
            if let Some((rank, file)) = offset(king_rank, king_file, dr, df) {
                if !occupied(rank, file) {
                    for slot in live_enemy_slots_of(self, Piece::Knight) {
                        per_slot[rank][file][slot] += KING_ATTACK;
                    }
                }
            }
        }

        // Sliding rays out of the king: full weight before the first blocker,
        // pin weight behind exactly one, stop at two.
        for (ray, (dr, df)) in STRAIGHT_DIRS.iter().chain(DIAGONAL_DIRS.iter()).enumerate() {
            let straight = ray < STRAIGHT_DIRS.len();
            let mut hits = 0;
            let (mut rank, mut file) = (king_rank, king_file);
            while let Some((r, f)) = offset(rank, file, *dr, *df) {
                if hits >= 2 {
                    break;
                }
                if occupied(r, f) {
                    hits += 1;
                } else {
                    let bonus = if hits == 0 { KING_ATTACK } else { PIECE_PIN };
                    let classes: &[Piece] = if straight {
                        &[Piece::Rook, Piece::Queen]
                    } else {
                        &[Piece::Bishop, Piece::Queen]
                    };
                    for &class in classes {
                        for slot in live_enemy_slots_of(self, class) {
                            per_slot[r][f][slot] += bonus;
                        }
                    }
                }
                (rank, file) = (r, f);
            }
        }

        let mut map = [[0.0_f64; 8]; 8];
        for rank in 0..8 {
            for file in 0..8 {
                let peak = per_slot[rank][file].iter().fold(0.0_f64, |a, &b| a.max(b));
                map[rank][file] =
                    peak + self.staleness[rank][file] + self.base_uncertainty[rank][file];
            }
        }
        map
    }

    /// Picks the 3×3 sense window center with the greatest summed
    /// uncertainty. Deterministic: ties break to the lowest row-major square.
    pub fn choose_sense(&self) -> Square {
        let map = self.board_uncertainty();
        let mut best = (0, 0);
        let mut best_score = f64::NEG_INFINITY;
        for rank in 0..8 {
            for file in 0..8 {
                let mut score = 0.0;
                for dr in -1..=1 {
                    for df in -1..=1 {
                        if let Some((r, f)) = offset(rank, file, dr, df) {
                            score += map[r][f];
                        }
                    }
                }
                if score > best_score {
                    best_score = score;
                    best = (rank, file);
                }
            }
        }
        square_at(best.0, best.1)
    }
}

fn live_enemy_slots_of(grid: &BeliefGrid, class: Piece) -> Vec<usize> {
    (0..SLOTS_PER_SIDE)
        .filter(|&slot| slot_class(slot) == class && grid.is_alive(slot))
        .collect()
}
