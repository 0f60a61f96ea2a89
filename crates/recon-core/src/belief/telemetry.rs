//! Summary snapshots of a belief state for logging and analysis.

use super::grid::BeliefGrid;
use crate::model::slot::SLOTS_PER_SIDE;
use serde::Serialize;

/// Point-in-time summary of a [`BeliefGrid`].
#[derive(Debug, Clone, Serialize)]
pub struct BeliefMetrics {
    /// Enemy slots still in play.
    pub alive_enemy_slots: usize,
    /// Shannon entropy of the full tensor, in bits.
    pub entropy_bits: f64,
    /// `2^entropy`, saturated to `f64::MAX` — the plausible-state estimate in
    /// a JSON-friendly form.
    pub estimated_states: f64,
    /// Per-slot entropy in bits, enemy slots only.
    pub slot_entropy_bits: Vec<f64>,
}

impl BeliefMetrics {
    pub fn from_grid(grid: &BeliefGrid) -> Self {
        let alive_enemy_slots = (0..SLOTS_PER_SIDE).filter(|&s| grid.is_alive(s)).count();

        let mut slot_entropy_bits = Vec::with_capacity(SLOTS_PER_SIDE);
        for slot in 0..SLOTS_PER_SIDE {
            let mut entropy = 0.0;
            for row in grid.plane(slot) {
                for &p in row {
                    if p > 0.0 {
                        entropy -= p * p.log2();
                    }
                }
            }
            slot_entropy_bits.push(entropy);
        }

        let entropy_bits = grid.entropy_bits();
        let estimated_states = if entropy_bits >= f64::MAX.log2() {
            f64::MAX
        } else {
            2f64.powf(entropy_bits)
        };

        Self {
            alive_enemy_slots,
            entropy_bits,
            estimated_states,
            slot_entropy_bits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::CandidateMove;
    use chess::{Board, ChessMove, Piece, Square};
    use std::str::FromStr;

    #[test]
    fn certain_grid_reports_zero_entropy() {
        let grid = BeliefGrid::with_seed(&Board::default(), 1);
        let metrics = BeliefMetrics::from_grid(&grid);
        assert_eq!(metrics.alive_enemy_slots, 16);
        assert_eq!(metrics.entropy_bits, 0.0);
        assert_eq!(metrics.estimated_states, 1.0);
        assert!(metrics.slot_entropy_bits.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn metrics_serialize_to_json() {
        let mut grid = BeliefGrid::with_seed(&Board::default(), 1);
        grid.handle_opponent_move(
            vec![CandidateMove::new(
                ChessMove::new(
                    Square::from_str("g8").unwrap(),
                    Square::from_str("f6").unwrap(),
                    None,
                ),
                Piece::Knight,
                0.5,
            )],
            false,
            None,
        );
        let metrics = BeliefMetrics::from_grid(&grid);
        assert!(metrics.entropy_bits > 0.0);

        let json = serde_json::to_string(&metrics).expect("metrics serialize");
        assert!(json.contains("entropy_bits"));
    }
}
