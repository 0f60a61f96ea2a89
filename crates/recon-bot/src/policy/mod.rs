//! Board-scoring interface consumed by the agent's move selection.

use chess::Board;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Scores batches of concrete boards from the mover's point of view. Higher
/// is better. Implementations are free to be stateful (caches, RNGs,
/// external engines).
pub trait Policy: Send {
    fn score_boards(&mut self, boards: &[Board]) -> Vec<f64>;
}

/// Baseline policy: uniformly random scores. Useful as an opponent floor and
/// for exercising the full decision loop without an evaluator.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: SmallRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn score_boards(&mut self, boards: &[Board]) -> Vec<f64> {
        boards
            .iter()
            .map(|_| self.rng.gen_range(-50.0..50.0))
            .collect()
    }
}
