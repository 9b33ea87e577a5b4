//! Fetch failure tracking with exponential backoff.

use std::time::Duration;

use bucketscale_core::TriggerHealth;
use tracing::{error, info};

use crate::error::FetchError;

/// Consecutive fetch failures for one trigger, the delay before the
/// next attempt, and the resulting health.
#[derive(Debug)]
pub struct FailureTracker {
    health: TriggerHealth,
    consecutive_failures: u32,
    /// Credential rejections since the last successful fetch.
    consecutive_auth_failures: u32,
    /// Auth failures at which the trigger is reported degraded (inclusive).
    degraded_threshold: u32,
    current_delay: Duration,
    /// The polling interval.
    base_interval: Duration,
    max_backoff: Duration,
}

impl FailureTracker {
    /// `max_backoff` below `base_interval` is raised to it; a zero
    /// threshold is treated as one.
    pub fn new(base_interval: Duration, max_backoff: Duration, degraded_threshold: u32) -> Self {
        Self {
            health: TriggerHealth::Unknown,
            consecutive_failures: 0,
            consecutive_auth_failures: 0,
            degraded_threshold: degraded_threshold.max(1),
            current_delay: base_interval,
            base_interval,
            max_backoff: max_backoff.max(base_interval),
        }
    }

    /// Record a successful fetch; resets the streak and the delay.
    pub fn record_success(&mut self) -> TriggerHealth {
        if self.consecutive_failures > 0 {
            info!(
                failures = self.consecutive_failures,
                "metric source recovered"
            );
        }
        self.consecutive_failures = 0;
        self.consecutive_auth_failures = 0;
        self.current_delay = self.base_interval;
        self.health = TriggerHealth::Healthy;
        self.health
    }

    /// Record a failed fetch and return the new health.
    pub fn record_failure(&mut self, err: &FetchError) -> TriggerHealth {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.current_delay = self.current_delay.saturating_mul(2).min(self.max_backoff);

        if err.is_auth() {
            self.consecutive_auth_failures = self.consecutive_auth_failures.saturating_add(1);
            if self.consecutive_auth_failures >= self.degraded_threshold
                && self.health != TriggerHealth::Degraded
            {
                error!(
                    failures = self.consecutive_auth_failures,
                    threshold = self.degraded_threshold,
                    "credentials keep being rejected, trigger degraded"
                );
                self.health = TriggerHealth::Degraded;
            }
        }

        self.health
    }

    pub fn health(&self) -> TriggerHealth {
        self.health
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Delay before the next fetch attempt.
    pub fn next_delay(&self) -> Duration {
        self.current_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> FailureTracker {
        FailureTracker::new(Duration::from_secs(5), Duration::from_secs(60), 3)
    }

    #[test]
    fn starts_unknown_at_interval() {
        let t = tracker();
        assert_eq!(t.health(), TriggerHealth::Unknown);
        assert_eq!(t.consecutive_failures(), 0);
        assert_eq!(t.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn backoff_doubles_up_to_ceiling() {
        let mut t = tracker();
        let err = FetchError::Timeout(Duration::from_secs(5));
        let delays: Vec<u64> = (0..6)
            .map(|_| {
                t.record_failure(&err);
                t.next_delay().as_secs()
            })
            .collect();
        assert_eq!(delays, vec![10, 20, 40, 60, 60, 60]);
        assert_eq!(t.consecutive_failures(), 6);
    }

    #[test]
    fn success_resets_streak_and_delay() {
        let mut t = tracker();
        t.record_failure(&FetchError::RateLimited);
        t.record_failure(&FetchError::RateLimited);
        assert_eq!(t.record_success(), TriggerHealth::Healthy);
        assert_eq!(t.consecutive_failures(), 0);
        assert_eq!(t.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn transient_failures_do_not_degrade() {
        let mut t = tracker();
        t.record_success();
        for _ in 0..10 {
            assert_eq!(
                t.record_failure(&FetchError::Network("reset".into())),
                TriggerHealth::Healthy
            );
        }
    }

    #[test]
    fn auth_failures_degrade_at_threshold() {
        let mut t = tracker();
        t.record_success();
        let err = FetchError::Auth("denied".into());
        assert_eq!(t.record_failure(&err), TriggerHealth::Healthy);
        assert_eq!(t.record_failure(&err), TriggerHealth::Healthy);
        assert_eq!(t.record_failure(&err), TriggerHealth::Degraded);
        assert_eq!(t.record_failure(&err), TriggerHealth::Degraded);

        assert_eq!(t.record_success(), TriggerHealth::Healthy);
    }

    #[test]
    fn ceiling_never_below_interval() {
        let mut t = FailureTracker::new(Duration::from_secs(120), Duration::from_secs(60), 0);
        t.record_failure(&FetchError::RateLimited);
        assert_eq!(t.next_delay(), Duration::from_secs(120));
        // Threshold of zero degrades on the first auth failure.
        assert_eq!(
            t.record_failure(&FetchError::Auth("denied".into())),
            TriggerHealth::Degraded
        );
    }
}
