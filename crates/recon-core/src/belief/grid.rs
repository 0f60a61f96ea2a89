//! The belief tensor, slot metadata, and deterministic updates for the
//! agent's own moves.

use super::{CERTAIN_MASS, MASS_EPSILON, STALENESS_STEP};
use crate::model::geometry::{file_of, rank_of};
use crate::model::slot::{
    FileMask, NUM_SLOTS, SLOTS_PER_SIDE, SlotId, is_pawn_slot, slot_class, slot_color,
};
use chess::{ALL_SQUARES, Board, ChessMove, Piece, Square};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// One slot's probability distribution over the board, indexed `[rank][file]`.
pub type Plane = [[f64; 8]; 8];

/// Whether a slot is still in play, and if not, which other identities it
/// could plausibly have been. Candidates are diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotFate {
    Alive,
    Captured { candidates: Vec<SlotId> },
}

/// Per-piece probability distributions over the board, plus the metadata the
/// inference rules hang off them.
///
/// Invariants: every alive slot's plane sums to 1 after `normalize`, every
/// captured slot's plane sums to 0, and the own-side slots (`16..32`) are
/// exactly one-hot at all times.
#[derive(Debug, Clone)]
pub struct BeliefGrid {
    pub(super) planes: [Plane; NUM_SLOTS],
    pub(super) fates: [SlotFate; NUM_SLOTS],
    pub(super) promoted: [bool; NUM_SLOTS],
    pub(super) pawn_files: [FileMask; NUM_SLOTS],
    pub(super) move_cache: Vec<super::CandidateMove>,
    pub(super) snapshot: Option<Box<[Plane; NUM_SLOTS]>>,
    pub(super) base_uncertainty: [[f64; 8]; 8],
    pub(super) staleness: [[f64; 8]; 8],
    pub(super) rng: SmallRng,
}

impl BeliefGrid {
    /// Builds a fully-certain belief from a known starting board.
    pub fn new(start: &Board) -> Self {
        Self::from_board(start, SmallRng::from_entropy())
    }

    /// Like [`BeliefGrid::new`] with an explicit seed for deterministic
    /// capture-fallback and sampling draws.
    pub fn with_seed(start: &Board, seed: u64) -> Self {
        Self::from_board(start, SmallRng::seed_from_u64(seed))
    }

    fn from_board(start: &Board, rng: SmallRng) -> Self {
        let mut occupants: [Option<(Piece, chess::Color)>; 64] = [None; 64];
        for sq in ALL_SQUARES {
            if let (Some(piece), Some(color)) = (start.piece_on(sq), start.color_on(sq)) {
                occupants[sq.to_index()] = Some((piece, color));
            }
        }

        let mut grid = Self {
            planes: [[[0.0; 8]; 8]; NUM_SLOTS],
            fates: std::array::from_fn(|_| SlotFate::Alive),
            promoted: [false; NUM_SLOTS],
            pawn_files: [FileMask::EMPTY; NUM_SLOTS],
            move_cache: Vec::new(),
            snapshot: None,
            base_uncertainty: [[0.0; 8]; 8],
            staleness: [[0.0; 8]; 8],
            rng,
        };

        for slot in 0..NUM_SLOTS {
            let wanted = (slot_class(slot), slot_color(slot));
            // Claim the lowest-index matching square and remove it from the
            // lookup copy so two same-type slots never share a square.
            match (0..64).find(|&idx| occupants[idx] == Some(wanted)) {
                Some(idx) => {
                    occupants[idx] = None;
                    let square = ALL_SQUARES[idx];
                    grid.planes[slot][rank_of(square)][file_of(square)] = 1.0;
                    if is_pawn_slot(slot) {
                        grid.pawn_files[slot] = FileMask::single(file_of(square));
                    }
                }
                None => grid.fates[slot] = SlotFate::Captured { candidates: Vec::new() },
            }
        }

        grid
    }

    /// Rescales every plane to unit mass. Planes whose total falls below
    /// [`MASS_EPSILON`] are left untouched rather than divided toward blowup.
    pub fn normalize(&mut self) {
        for plane in &mut self.planes {
            let total: f64 = plane.iter().flatten().sum();
            if total < MASS_EPSILON {
                continue;
            }
            for row in plane.iter_mut() {
                for cell in row.iter_mut() {
                    *cell /= total;
                }
            }
        }
    }

    pub fn mass(&self, slot: SlotId, square: Square) -> f64 {
        self.planes[slot][rank_of(square)][file_of(square)]
    }

    pub fn plane(&self, slot: SlotId) -> &Plane {
        &self.planes[slot]
    }

    pub fn slot_mass_total(&self, slot: SlotId) -> f64 {
        self.planes[slot].iter().flatten().sum()
    }

    pub fn fate(&self, slot: SlotId) -> &SlotFate {
        &self.fates[slot]
    }

    pub fn is_alive(&self, slot: SlotId) -> bool {
        matches!(self.fates[slot], SlotFate::Alive)
    }

    pub fn is_promoted(&self, slot: SlotId) -> bool {
        self.promoted[slot]
    }

    pub fn pawn_files(&self, slot: SlotId) -> FileMask {
        self.pawn_files[slot]
    }

    pub fn move_cache(&self) -> &[super::CandidateMove] {
        &self.move_cache
    }

    pub fn base_uncertainty_at(&self, square: Square) -> f64 {
        self.base_uncertainty[rank_of(square)][file_of(square)]
    }

    pub fn staleness_at(&self, square: Square) -> f64 {
        self.staleness[rank_of(square)][file_of(square)]
    }

    /// The square holding a slot's greatest mass, first by row-major order on
    /// ties.
    pub(super) fn peak_square(&self, slot: SlotId) -> (usize, usize, f64) {
        let mut best = (0, 0, f64::NEG_INFINITY);
        for (rank, row) in self.planes[slot].iter().enumerate() {
            for (file, &mass) in row.iter().enumerate() {
                if mass > best.2 {
                    best = (rank, file, mass);
                }
            }
        }
        best
    }

    pub(super) fn mark_captured(&mut self, slot: SlotId, candidates: Vec<SlotId>) {
        self.fates[slot] = SlotFate::Captured { candidates };
        self.planes[slot] = [[0.0; 8]; 8];
    }

    /// Ages the staleness bias: every square with a near-certain enemy
    /// occupant accrues a fixed increment until it is re-sensed.
    pub(super) fn age_staleness(&mut self) {
        for rank in 0..8 {
            for file in 0..8 {
                let enemy_peak = (0..SLOTS_PER_SIDE)
                    .map(|slot| self.planes[slot][rank][file])
                    .fold(0.0_f64, f64::max);
                if enemy_peak > CERTAIN_MASS {
                    self.staleness[rank][file] += STALENESS_STEP;
                }
            }
        }
    }

    /// Deterministic update after the agent completes its own move. `None`
    /// means a pass and leaves the state untouched.
    pub fn handle_own_move(&mut self, mv: Option<ChessMove>, captured_enemy_piece: bool) {
        let Some(mv) = mv else {
            return;
        };

        let (from_rank, from_file) = (rank_of(mv.get_source()), file_of(mv.get_source()));
        let (to_rank, to_file) = (rank_of(mv.get_dest()), file_of(mv.get_dest()));

        // Under the own-certainty invariant the mover carries mass 1.0 at the
        // origin.
        let mover = self.argmax_slot_at(SLOTS_PER_SIDE..NUM_SLOTS, from_rank, from_file);
        self.planes[mover][from_rank][from_file] = 0.0;

        if captured_enemy_piece {
            self.capture_enemy_at(to_rank, to_file);
        }

        self.planes[mover][to_rank][to_file] = 1.0;
        if mv.get_promotion().is_some() {
            self.promoted[mover] = true;
        }
        self.normalize();
    }

    /// First slot in `range` (row-major over slots) with the greatest mass at
    /// the given square; ties resolve to the lowest index for reproducibility.
    pub(super) fn argmax_slot_at(
        &self,
        range: std::ops::Range<SlotId>,
        rank: usize,
        file: usize,
    ) -> SlotId {
        let mut best = range.start;
        let mut best_mass = f64::NEG_INFINITY;
        for slot in range {
            let mass = self.planes[slot][rank][file];
            if mass > best_mass {
                best_mass = mass;
                best = slot;
            }
        }
        best
    }

    fn capture_enemy_at(&mut self, rank: usize, file: usize) {
        let victim = self.argmax_slot_at(0..SLOTS_PER_SIDE, rank, file);

        if self.planes[victim][rank][file] > MASS_EPSILON {
            let candidates: Vec<SlotId> = (0..SLOTS_PER_SIDE)
                .filter(|&slot| slot != victim && self.planes[slot][rank][file] > MASS_EPSILON)
                .collect();
            self.mark_captured(victim, candidates);
            return;
        }

        // Nothing informative at the destination: pick an unidentified
        // non-king victim uniformly at random.
        let pool: Vec<SlotId> = (0..SLOTS_PER_SIDE)
            .filter(|&slot| self.is_alive(slot) && slot_class(slot) != Piece::King)
            .collect();
        if pool.is_empty() {
            return;
        }
        let victim = pool[self.rng.gen_range(0..pool.len())];
        let candidates: Vec<SlotId> = pool.into_iter().filter(|&slot| slot != victim).collect();
        self.mark_captured(victim, candidates);
    }

    /// Flips the belief to the opposite perspective in place: slot ranges
    /// swap, ranks and files reverse, and the perspective-specific caches
    /// (candidate moves, snapshot, bias grids) are dropped.
    pub fn mirror(&mut self) {
        let mut planes = [[[0.0; 8]; 8]; NUM_SLOTS];
        for slot in 0..NUM_SLOTS {
            let partner = (slot + SLOTS_PER_SIDE) % NUM_SLOTS;
            for rank in 0..8 {
                for file in 0..8 {
                    planes[partner][7 - rank][7 - file] = self.planes[slot][rank][file];
                }
            }
        }
        self.planes = planes;

        for slot in 0..SLOTS_PER_SIDE {
            self.fates.swap(slot, slot + SLOTS_PER_SIDE);
            self.promoted.swap(slot, slot + SLOTS_PER_SIDE);
            let (a, b) = (
                self.pawn_files[slot].mirrored(),
                self.pawn_files[slot + SLOTS_PER_SIDE].mirrored(),
            );
            self.pawn_files[slot] = b;
            self.pawn_files[slot + SLOTS_PER_SIDE] = a;
        }

        self.move_cache.clear();
        self.snapshot = None;
        self.base_uncertainty = [[0.0; 8]; 8];
        self.staleness = [[0.0; 8]; 8];
    }

    /// Shannon entropy of the full tensor in bits, treating each cell as an
    /// independent indicator probability.
    pub fn entropy_bits(&self) -> f64 {
        let mut entropy = 0.0;
        for plane in &self.planes {
            for row in plane {
                for &p in row {
                    if p > 0.0 {
                        entropy -= p * p.log2();
                    }
                }
            }
        }
        entropy
    }

    /// Approximate count of distinct board states consistent with the belief,
    /// `ceil(2^H)`, saturating once the entropy exceeds 127 bits.
    pub fn estimated_state_count(&self) -> u128 {
        let entropy = self.entropy_bits();
        if entropy >= 127.0 {
            u128::MAX
        } else {
            2f64.powf(entropy).ceil() as u128
        }
    }

    #[cfg(test)]
    pub(super) fn assert_invariants(&self) {
        for slot in 0..NUM_SLOTS {
            let total = self.slot_mass_total(slot);
            match self.fates[slot] {
                SlotFate::Alive => assert!(
                    (total - 1.0).abs() < 1e-6,
                    "alive slot {slot} has mass {total}"
                ),
                SlotFate::Captured { .. } => {
                    assert_eq!(total, 0.0, "captured slot {slot} has mass {total}")
                }
            }
            for row in &self.planes[slot] {
                for &cell in row {
                    assert!(cell >= 0.0 && cell.is_finite(), "bad cell {cell}");
                }
            }
        }
        for slot in SLOTS_PER_SIDE..NUM_SLOTS {
            if !self.is_alive(slot) {
                continue;
            }
            let ones = self.planes[slot]
                .iter()
                .flatten()
                .filter(|&&cell| cell == 1.0)
                .count();
            let zeros = self.planes[slot]
                .iter()
                .flatten()
                .filter(|&&cell| cell == 0.0)
                .count();
            assert_eq!((ones, zeros), (1, 63), "own slot {slot} not one-hot");
        }
    }
}
