//! bucketscale-trigger — the per-trigger polling loop.
//!
//! # Architecture
//!
//! ```text
//! TriggerRegistry
//!   └── one background task per trigger (PollingController::run)
//!         ├── MetricSource::fetch_count()   bounded by the fetch timeout
//!         ├── DecisionEngine::evaluate()    sizing + cooldown hold
//!         ├── FailureTracker                backoff, degraded health
//!         └── DecisionSink::emit()          latest decision for the orchestrator
//! ```
//!
//! A loop is strictly sequential: the next fetch never starts before the
//! previous one has completed or timed out, and decisions are emitted in
//! tick order. Fetch failures never end a loop; they keep the previous
//! decision in place and stretch the wait before the next attempt.

pub mod backoff;
pub mod board;
pub mod controller;
pub mod error;
pub mod registry;
pub mod sink;
pub mod source;

pub use backoff::FailureTracker;
pub use board::{DecisionBoard, TriggerStatus};
pub use controller::{ControllerOptions, PollingController, TickOutcome};
pub use error::FetchError;
pub use registry::TriggerRegistry;
pub use sink::DecisionSink;
pub use source::{FetchRequest, LocalBucketSource, MetricSource};
