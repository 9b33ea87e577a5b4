//! bucketscale-scaler — maps object counts to replica counts.
//!
//! # Algorithm
//!
//! ```text
//! raw = clamp(ceil(count / target), min, max)     // count == 0 → min
//!
//! count > 0                      → raw,      DEMAND   (cooldown timer reset)
//! count == 0, within cooldown    → previous, COOLDOWN
//! count == 0, cooldown elapsed   → min,      IDLE
//! ```
//!
//! Everything here is synchronous and side-effect free apart from the
//! cooldown bookkeeping, so it can be driven with hand-made instants.

pub mod cooldown;
pub mod engine;
pub mod scaler;

pub use cooldown::{CooldownPhase, CooldownTracker};
pub use engine::DecisionEngine;
pub use scaler::{ceiling_divide, compute};
