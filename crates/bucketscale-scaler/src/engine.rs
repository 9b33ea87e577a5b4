//! Decision engine — sizing plus the cooldown hold rule.
//!
//! Owns the cooldown state of exactly one trigger. The polling loop is
//! the only caller, so no locking is involved.

use std::time::Instant;

use bucketscale_core::{DecisionReason, MetricSample, ScalingDecision, ScalingRule};
use tracing::debug;

use crate::cooldown::{CooldownPhase, CooldownTracker};
use crate::scaler::compute;

pub struct DecisionEngine {
    rule: ScalingRule,
    tracker: CooldownTracker,
    /// Replica count of the last decision returned.
    last_desired: Option<u32>,
}

impl DecisionEngine {
    /// Create the engine for a trigger registered at `created_at`.
    pub fn new(rule: ScalingRule, created_at: Instant) -> Self {
        let tracker = CooldownTracker::new(rule.cooldown_period(), created_at);
        Self {
            rule,
            tracker,
            last_desired: None,
        }
    }

    /// Turn one sample into the decision to emit.
    ///
    /// While demand is zero but the cooldown window is still open, the
    /// previous decision's replica count is held (or the minimum when
    /// nothing has been decided yet).
    pub fn evaluate(&mut self, sample: &MetricSample) -> ScalingDecision {
        let phase = self.tracker.observe(sample);
        let raw = compute(sample, &self.rule);

        let (desired, reason) = match phase {
            CooldownPhase::Active => (raw, DecisionReason::Demand),
            CooldownPhase::Cooling => (
                self.last_desired.unwrap_or(self.rule.min_replicas()),
                DecisionReason::Cooldown,
            ),
            CooldownPhase::Idle => (raw, DecisionReason::Idle),
        };

        if self.last_desired != Some(desired) {
            debug!(
                bucket = %self.rule.bucket(),
                from = ?self.last_desired,
                to = desired,
                count = sample.count,
                %reason,
                "desired replicas changed"
            );
        }
        self.last_desired = Some(desired);

        ScalingDecision {
            desired_replicas: desired,
            reason,
            sample_count: sample.count,
            computed_at: sample.observed_at,
        }
    }

    pub fn phase(&self) -> CooldownPhase {
        self.tracker.phase()
    }

    pub fn last_desired(&self) -> Option<u32> {
        self.last_desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine(min: i64, max: i64, cooldown: i64, t0: Instant) -> DecisionEngine {
        let rule = ScalingRule::new("keda-test-storage-bucket", 5, min, max, 5, cooldown).unwrap();
        DecisionEngine::new(rule, t0)
    }

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    #[test]
    fn thirty_objects_scale_to_max() {
        let t0 = Instant::now();
        let mut engine = engine(0, 3, 10, t0);

        let d = engine.evaluate(&MetricSample::new(30, t0));
        assert_eq!(d.desired_replicas, 3);
        assert_eq!(d.reason, DecisionReason::Demand);
        assert_eq!(d.sample_count, 30);
        assert_eq!(d.computed_at, t0);
    }

    #[test]
    fn holds_through_cooldown_then_idles() {
        let t0 = Instant::now();
        let mut engine = engine(0, 3, 10, t0);
        engine.evaluate(&MetricSample::new(5, t0));

        for s in 1..10 {
            let d = engine.evaluate(&MetricSample::new(0, at(t0, s)));
            assert_eq!(d.desired_replicas, 1, "t={s}");
            assert_eq!(d.reason, DecisionReason::Cooldown);
        }

        let d = engine.evaluate(&MetricSample::new(0, at(t0, 10)));
        assert_eq!(d.desired_replicas, 0);
        assert_eq!(d.reason, DecisionReason::Idle);
    }

    #[test]
    fn bucket_emptied_after_burst() {
        let t0 = Instant::now();
        let mut engine = engine(0, 3, 10, t0);
        assert_eq!(engine.evaluate(&MetricSample::new(30, t0)).desired_replicas, 3);

        // Polling every 5s: two held ticks, then idle.
        let d = engine.evaluate(&MetricSample::new(0, at(t0, 5)));
        assert_eq!((d.desired_replicas, d.reason), (3, DecisionReason::Cooldown));
        let d = engine.evaluate(&MetricSample::new(0, at(t0, 9)));
        assert_eq!((d.desired_replicas, d.reason), (3, DecisionReason::Cooldown));
        let d = engine.evaluate(&MetricSample::new(0, at(t0, 10)));
        assert_eq!((d.desired_replicas, d.reason), (0, DecisionReason::Idle));
    }

    #[test]
    fn demand_resumes_without_delay() {
        let t0 = Instant::now();
        let mut engine = engine(0, 3, 10, t0);
        engine.evaluate(&MetricSample::new(0, at(t0, 20)));
        assert_eq!(engine.phase(), CooldownPhase::Idle);

        let d = engine.evaluate(&MetricSample::new(12, at(t0, 21)));
        assert_eq!((d.desired_replicas, d.reason), (3, DecisionReason::Demand));
        assert_eq!(engine.phase(), CooldownPhase::Active);
    }

    #[test]
    fn first_empty_sample_holds_at_min() {
        let t0 = Instant::now();
        let mut engine = engine(1, 3, 10, t0);

        let d = engine.evaluate(&MetricSample::new(0, t0));
        assert_eq!((d.desired_replicas, d.reason), (1, DecisionReason::Cooldown));
        assert_eq!(engine.last_desired(), Some(1));
    }

    #[test]
    fn small_demand_at_min_is_not_held() {
        let t0 = Instant::now();
        let mut engine = engine(1, 5, 10, t0);
        engine.evaluate(&MetricSample::new(20, t0));

        // 3 objects need one replica, which is the minimum; demand is
        // present so the value is not held at 4.
        let d = engine.evaluate(&MetricSample::new(3, at(t0, 1)));
        assert_eq!((d.desired_replicas, d.reason), (1, DecisionReason::Demand));
    }

    #[test]
    fn idle_with_positive_min() {
        let t0 = Instant::now();
        let mut engine = engine(2, 6, 0, t0);
        engine.evaluate(&MetricSample::new(30, t0));

        let d = engine.evaluate(&MetricSample::new(0, at(t0, 1)));
        assert_eq!((d.desired_replicas, d.reason), (2, DecisionReason::Idle));
    }

    #[test]
    fn decisions_stay_in_range() {
        let t0 = Instant::now();
        let mut engine = engine(1, 4, 3, t0);
        let counts = [0, 100, 0, 0, 7, 0, 0, 0, 0, 1, 50_000, 0];
        for (i, count) in counts.into_iter().enumerate() {
            let d = engine.evaluate(&MetricSample::new(count, at(t0, i as u64)));
            assert!((1..=4).contains(&d.desired_replicas), "tick {i}: {d:?}");
        }
    }
}
