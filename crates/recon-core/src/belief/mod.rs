//! Probabilistic belief tracking over a hidden chessboard.
//!
//! This module is composed of:
//! - `grid`: the belief tensor, slot metadata, and deterministic own-move updates.
//! - `diffusion`: probability-mass redistribution for weighted candidate move lists.
//! - `capture`: reachability-based inference when one of our pieces disappears.
//! - `sense`: Bayesian narrowing from a 3×3 ground-truth window.
//! - `uncertainty`: the sense-targeting heat map.
//! - `sampler`: concrete-board determinization consuming the belief state.
//! - `telemetry`: summary metrics snapshots.

mod capture;
mod diffusion;
mod grid;
mod sampler;
mod sense;
pub mod telemetry;
mod uncertainty;

pub use diffusion::CandidateMove;
pub use grid::{BeliefGrid, Plane, SlotFate};
pub use sampler::{SAMPLE_ORDER, SampledBoard};
pub use sense::SenseObservation;
pub use telemetry::BeliefMetrics;

/// Below this total mass a plane is treated as empty rather than renormalized.
pub const MASS_EPSILON: f64 = 1e-3;

/// A cell above this is treated as a known occupant.
pub const CERTAIN_MASS: f64 = 0.999;

/// Peak-mass threshold for placing a slot on the certain-board projection.
pub const PROJECTION_THRESHOLD: f64 = 0.99;

/// Heat-map bonus for squares that could hide a direct attack on our king.
pub const KING_ATTACK: f64 = 0.25;

/// Heat-map bonus for squares behind a single blocker on a king ray.
pub const PIECE_PIN: f64 = 0.15;

/// Base-uncertainty level set on a capture square with no identifiable attacker.
pub const CAPTURE_SPIKE: f64 = 0.5;

/// Per-turn staleness accrued by squares with an un-re-sensed known occupant.
pub const STALENESS_STEP: f64 = 0.05;
