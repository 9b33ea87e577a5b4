//! Per-tick data types.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One object-count reading from the metric source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSample {
    /// Number of objects pending in the bucket.
    pub count: u64,
    /// When the reading was taken.
    pub observed_at: Instant,
}

impl MetricSample {
    pub fn new(count: u64, observed_at: Instant) -> Self {
        Self { count, observed_at }
    }
}

/// Why a decision has the value it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    /// Sized from a non-zero object count.
    Demand,
    /// Demand is zero but the cooldown window has not elapsed; the
    /// previous value is held.
    Cooldown,
    /// Demand has been zero for the whole cooldown window.
    Idle,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demand => "DEMAND",
            Self::Cooldown => "COOLDOWN",
            Self::Idle => "IDLE",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The desired replica count emitted for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingDecision {
    /// Always within `[min_replicas, max_replicas]` of the rule.
    pub desired_replicas: u32,
    pub reason: DecisionReason,
    /// Object count of the sample this decision was computed from.
    pub sample_count: u64,
    pub computed_at: Instant,
}

/// Health of a trigger's metric fetches as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerHealth {
    /// No fetch has completed yet.
    #[default]
    Unknown,
    Healthy,
    /// Credentials have been rejected past the configured threshold.
    Degraded,
}

impl std::fmt::Display for TriggerHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Healthy => f.write_str("healthy"),
            Self::Degraded => f.write_str("degraded"),
        }
    }
}
