//! Bayesian narrowing from an observed 3×3 ground-truth window.

use super::grid::BeliefGrid;
use super::{CERTAIN_MASS, MASS_EPSILON};
use crate::model::geometry::{file_of, rank_of};
use crate::model::slot::{NUM_SLOTS, OWN_SIDE, SLOTS_PER_SIDE, is_pawn_slot, slot_class};
use chess::{Color, Piece, Square};

/// One revealed square: its true occupant, or `None` when empty.
pub type SenseObservation = (Square, Option<(Piece, Color)>);

impl BeliefGrid {
    /// Consumes a sense result.
    ///
    /// First the cached candidate move list is pruned against the window and
    /// the speculative diffusion is replayed from the pre-move snapshot with
    /// the refined list; then each observed enemy piece collapses its best
    /// matching slot to a one-hot. Own pieces in the window inform pruning
    /// only — their positions are already certain.
    pub fn handle_sense_result(&mut self, observations: &[SenseObservation]) {
        if !self.move_cache.is_empty() {
            if let Some(snapshot) = self.snapshot.take() {
                self.replay_pruned_moves(observations, snapshot);
            }
        }

        self.collapse_observations(observations);

        for (square, _) in observations {
            let (rank, file) = (rank_of(*square), file_of(*square));
            self.base_uncertainty[rank][file] = 0.0;
            self.staleness[rank][file] = 0.0;
        }

        self.normalize();
    }

    fn replay_pruned_moves(
        &mut self,
        observations: &[SenseObservation],
        snapshot: Box<[super::Plane; NUM_SLOTS]>,
    ) {
        // Per-square max across slots, from the state before this turn's
        // speculative diffusion.
        let mut maxes = [[0.0_f64; 8]; 8];
        for plane in snapshot.iter() {
            for rank in 0..8 {
                for file in 0..8 {
                    maxes[rank][file] = maxes[rank][file].max(plane[rank][file]);
                }
            }
        }

        let mut moves = std::mem::take(&mut self.move_cache);
        for (square, occupant) in observations {
            let (rank, file) = (rank_of(*square), file_of(*square));

            if let Some((_, color)) = occupant {
                if *color == OWN_SIDE {
                    // An enemy move cannot have landed on one of our pieces
                    // without us being notified of a capture.
                    moves.retain(|m| m.mv.get_dest() != *square);
                    continue;
                }
            }
            let observed = occupant.map(|(piece, _)| piece);

            // A piece appeared on a previously near-empty square: it must be
            // the mover, arriving here.
            if maxes[rank][file] < MASS_EPSILON {
                if let Some(class) = observed {
                    moves.retain(|m| m.class == class && m.mv.get_dest() == *square);
                }
            }

            // A previously near-certain occupant constrains the mover's
            // origin.
            if maxes[rank][file] > CERTAIN_MASS {
                let known = self.argmax_snapshot_slot(&snapshot, rank, file);
                let known_class = slot_class(known);
                match observed {
                    None => moves.retain(|m| m.class == known_class && m.mv.get_source() == *square),
                    Some(class) if class == known_class => {
                        moves.retain(|m| m.mv.get_source() != *square)
                    }
                    Some(_) => {}
                }
            }

            // No move may land on a square whose observed contents disagree
            // with its class, or on a square now known to be empty.
            match observed {
                None => moves.retain(|m| m.mv.get_dest() != *square),
                Some(class) => moves.retain(|m| m.mv.get_dest() != *square || m.class == class),
            }
        }

        // Roll back the speculative pass and replay with the refined list. An
        // emptied list means genuinely no information: the pre-move prior
        // stands.
        self.planes = *snapshot;
        if !moves.is_empty() {
            let total: f64 = moves.iter().map(|m| m.chance).sum();
            if total > 0.0 {
                for m in &mut moves {
                    m.chance /= total;
                }
            }
            self.apply_move_distribution(&moves);
        }
        self.move_cache = moves;
    }

    fn argmax_snapshot_slot(
        &self,
        snapshot: &[super::Plane; NUM_SLOTS],
        rank: usize,
        file: usize,
    ) -> usize {
        let mut best = 0;
        let mut best_mass = f64::NEG_INFINITY;
        for (slot, plane) in snapshot.iter().enumerate() {
            if plane[rank][file] > best_mass {
                best_mass = plane[rank][file];
                best = slot;
            }
        }
        best
    }

    fn collapse_observations(&mut self, observations: &[SenseObservation]) {
        let mut assigned = [false; SLOTS_PER_SIDE];
        for (square, occupant) in observations {
            let Some((class, color)) = occupant else {
                continue;
            };
            if *color == OWN_SIDE {
                continue;
            }
            let (rank, file) = (rank_of(*square), file_of(*square));

            // Best unassigned, alive, class-matching slot by current mass.
            let mut best: Option<usize> = None;
            let mut best_mass = -1.0_f64;
            for slot in 0..SLOTS_PER_SIDE {
                if assigned[slot] || !self.is_alive(slot) || slot_class(slot) != *class {
                    continue;
                }
                if is_pawn_slot(slot) && !self.pawn_files[slot].contains(file) {
                    continue;
                }
                if self.planes[slot][rank][file] > best_mass {
                    best_mass = self.planes[slot][rank][file];
                    best = Some(slot);
                }
            }
            // No resolvable identity: keep the prior rather than guess.
            let Some(slot) = best else {
                continue;
            };

            self.planes[slot] = [[0.0; 8]; 8];
            for other in 0..NUM_SLOTS {
                self.planes[other][rank][file] = 0.0;
            }
            self.planes[slot][rank][file] = 1.0;
            assigned[slot] = true;
        }
    }
}
