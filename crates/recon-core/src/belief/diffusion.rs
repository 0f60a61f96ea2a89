//! Probability-mass redistribution for weighted candidate move lists.

use super::grid::BeliefGrid;
use crate::model::geometry::{file_of, rank_of};
use crate::model::slot::enemy_slots_for_class;
use chess::{ChessMove, Piece, Square};

/// One entry of the believed distribution over the opponent's last move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateMove {
    pub mv: ChessMove,
    pub class: Piece,
    pub chance: f64,
}

impl CandidateMove {
    pub fn new(mv: ChessMove, class: Piece, chance: f64) -> Self {
        Self { mv, class, chance }
    }
}

impl BeliefGrid {
    /// Moves `chance × mass-at-origin` from each candidate's origin to its
    /// destination, for every slot capable of producing that move class.
    /// Never changes a slot's total mass.
    pub fn apply_move_distribution(&mut self, moves: &[CandidateMove]) {
        for entry in moves {
            let (from_rank, from_file) = (rank_of(entry.mv.get_source()), file_of(entry.mv.get_source()));
            let (to_rank, to_file) = (rank_of(entry.mv.get_dest()), file_of(entry.mv.get_dest()));

            for slot in enemy_slots_for_class(entry.class, from_file) {
                let moved = self.planes[slot][from_rank][from_file] * entry.chance;
                self.planes[slot][from_rank][from_file] -= moved;
                self.planes[slot][to_rank][to_file] += moved;
            }
        }
    }

    /// Entry point for an opponent-move notification.
    ///
    /// Snapshots the pre-move tensor so the sense phase can roll back the
    /// speculative pass, then either runs capture inference (our piece
    /// vanished at `capture_square`) or applies the candidate list
    /// speculatively. A capture pins the opponent's action down, so the
    /// candidate cache is dropped on that branch.
    pub fn handle_opponent_move(
        &mut self,
        candidates: Vec<CandidateMove>,
        captured_own_piece: bool,
        capture_square: Option<Square>,
    ) {
        self.age_staleness();
        self.snapshot = Some(Box::new(self.planes));

        match capture_square {
            Some(square) if captured_own_piece => {
                self.move_cache.clear();
                self.infer_capture(square);
            }
            _ => {
                let moves = candidates;
                self.apply_move_distribution(&moves);
                self.move_cache = moves;
            }
        }
        self.normalize();
    }
}
