//! Scale-to-zero cooldown tracking.
//!
//! Remembers the last time demand was non-zero. A trigger starts as if
//! demand had just been seen, so the first scale-to-zero waits a full
//! cooldown window even when the very first sample is empty.

use std::time::{Duration, Instant};

use bucketscale_core::MetricSample;
use tracing::debug;

/// Where a trigger is in the cooldown cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownPhase {
    /// The latest sample had demand.
    Active,
    /// Demand is zero but the cooldown window is still running.
    Cooling,
    /// Demand has been zero for at least the cooldown window.
    Idle,
}

#[derive(Debug, Clone)]
pub struct CooldownTracker {
    cooldown: Duration,
    last_active_at: Instant,
    phase: CooldownPhase,
}

impl CooldownTracker {
    /// Create a tracker for a trigger registered at `created_at`.
    pub fn new(cooldown: Duration, created_at: Instant) -> Self {
        Self {
            cooldown,
            last_active_at: created_at,
            phase: CooldownPhase::Active,
        }
    }

    /// Feed one sample and return the resulting phase.
    ///
    /// `last_active_at` only moves on samples with demand, and never
    /// backwards.
    pub fn observe(&mut self, sample: &MetricSample) -> CooldownPhase {
        let next = if sample.count > 0 {
            if sample.observed_at > self.last_active_at {
                self.last_active_at = sample.observed_at;
            }
            CooldownPhase::Active
        } else {
            let quiet_for = sample
                .observed_at
                .saturating_duration_since(self.last_active_at);
            if quiet_for >= self.cooldown {
                CooldownPhase::Idle
            } else {
                CooldownPhase::Cooling
            }
        };

        if next != self.phase {
            debug!(from = ?self.phase, to = ?next, count = sample.count, "cooldown phase changed");
        }
        self.phase = next;
        next
    }

    /// Phase after the most recent [`observe`](Self::observe).
    pub fn phase(&self) -> CooldownPhase {
        self.phase
    }

    pub fn last_active_at(&self) -> Instant {
        self.last_active_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    #[test]
    fn demand_keeps_tracker_active() {
        let t0 = Instant::now();
        let mut tracker = CooldownTracker::new(Duration::from_secs(10), t0);

        let phase = tracker.observe(&MetricSample::new(5, at(t0, 3)));
        assert_eq!(phase, CooldownPhase::Active);
        assert_eq!(tracker.last_active_at(), at(t0, 3));
    }

    #[test]
    fn zero_samples_cool_then_idle() {
        let t0 = Instant::now();
        let mut tracker = CooldownTracker::new(Duration::from_secs(10), t0);
        tracker.observe(&MetricSample::new(5, t0));

        for s in 1..10 {
            assert_eq!(
                tracker.observe(&MetricSample::new(0, at(t0, s))),
                CooldownPhase::Cooling,
                "t={s}"
            );
        }
        assert_eq!(
            tracker.observe(&MetricSample::new(0, at(t0, 10))),
            CooldownPhase::Idle
        );
        assert_eq!(
            tracker.observe(&MetricSample::new(0, at(t0, 25))),
            CooldownPhase::Idle
        );
    }

    #[test]
    fn zero_samples_do_not_move_last_active() {
        let t0 = Instant::now();
        let mut tracker = CooldownTracker::new(Duration::from_secs(10), t0);
        tracker.observe(&MetricSample::new(3, at(t0, 2)));
        tracker.observe(&MetricSample::new(0, at(t0, 4)));
        tracker.observe(&MetricSample::new(0, at(t0, 20)));
        assert_eq!(tracker.last_active_at(), at(t0, 2));
    }

    #[test]
    fn demand_resumes_immediately() {
        let t0 = Instant::now();
        let mut tracker = CooldownTracker::new(Duration::from_secs(10), t0);
        assert_eq!(
            tracker.observe(&MetricSample::new(0, at(t0, 30))),
            CooldownPhase::Idle
        );
        assert_eq!(
            tracker.observe(&MetricSample::new(1, at(t0, 31))),
            CooldownPhase::Active
        );
        assert_eq!(
            tracker.observe(&MetricSample::new(0, at(t0, 32))),
            CooldownPhase::Cooling
        );
    }

    #[test]
    fn fresh_tracker_defers_scale_to_zero() {
        let t0 = Instant::now();
        let mut tracker = CooldownTracker::new(Duration::from_secs(10), t0);
        assert_eq!(
            tracker.observe(&MetricSample::new(0, t0)),
            CooldownPhase::Cooling
        );
        assert_eq!(
            tracker.observe(&MetricSample::new(0, at(t0, 10))),
            CooldownPhase::Idle
        );
    }

    #[test]
    fn zero_cooldown_goes_idle_at_once() {
        let t0 = Instant::now();
        let mut tracker = CooldownTracker::new(Duration::ZERO, t0);
        assert_eq!(
            tracker.observe(&MetricSample::new(0, t0)),
            CooldownPhase::Idle
        );
    }

    #[test]
    fn out_of_order_samples_do_not_rewind() {
        let t0 = Instant::now();
        let mut tracker = CooldownTracker::new(Duration::from_secs(10), t0);
        tracker.observe(&MetricSample::new(2, at(t0, 8)));
        tracker.observe(&MetricSample::new(2, at(t0, 5)));
        assert_eq!(tracker.last_active_at(), at(t0, 8));
        // Zero sample stamped before last activity counts as no quiet time.
        assert_eq!(
            tracker.observe(&MetricSample::new(0, at(t0, 6))),
            CooldownPhase::Cooling
        );
    }
}
