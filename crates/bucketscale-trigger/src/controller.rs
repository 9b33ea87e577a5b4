//! Polling controller — the timed loop of a single trigger.

use std::sync::Arc;
use std::time::Duration;

use bucketscale_core::{ControllerSettings, MetricSample, ScalingDecision, ScalingRule, TriggerHealth};
use bucketscale_scaler::DecisionEngine;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::backoff::FailureTracker;
use crate::error::FetchError;
use crate::sink::DecisionSink;
use crate::source::{FetchRequest, MetricSource};

/// Loop tuning shared by every trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Defaults to, and is capped at, the polling interval.
    pub fetch_timeout: Option<Duration>,
    pub max_backoff: Duration,
    /// Consecutive credential rejections before the trigger is degraded.
    pub degraded_threshold: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&ControllerSettings::default())
    }
}

impl From<&ControllerSettings> for ControllerOptions {
    fn from(settings: &ControllerSettings) -> Self {
        Self {
            fetch_timeout: settings.fetch_timeout_seconds.map(Duration::from_secs),
            max_backoff: Duration::from_secs(settings.max_backoff_seconds),
            degraded_threshold: settings.degraded_after_failures,
        }
    }
}

/// Result of one fetch/compute cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Decided(ScalingDecision),
    /// Nothing was emitted; the previous decision stands.
    Failed(FetchError),
}

pub struct PollingController {
    name: String,
    request: FetchRequest,
    interval: Duration,
    fetch_timeout: Duration,
    engine: DecisionEngine,
    failures: FailureTracker,
    last_decision: Option<ScalingDecision>,
    source: Arc<dyn MetricSource>,
    sink: Arc<dyn DecisionSink>,
}

impl PollingController {
    /// Create the controller for a validated rule. The cooldown clock
    /// starts now.
    pub fn new(
        name: impl Into<String>,
        rule: ScalingRule,
        source: Arc<dyn MetricSource>,
        sink: Arc<dyn DecisionSink>,
        options: &ControllerOptions,
    ) -> Self {
        let interval = rule.polling_interval();
        let fetch_timeout = options
            .fetch_timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(interval)
            .min(interval);
        Self {
            name: name.into(),
            request: FetchRequest::for_rule(&rule),
            interval,
            fetch_timeout,
            failures: FailureTracker::new(interval, options.max_backoff, options.degraded_threshold),
            engine: DecisionEngine::new(rule, now()),
            last_decision: None,
            source,
            sink,
        }
    }

    /// Run one complete cycle: fetch, decide, emit.
    pub async fn tick(&mut self) -> TickOutcome {
        let result = self.fetch().await;
        self.apply(result).await
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Ticks start a fixed delay apart, measured from the start of the
    /// previous fetch, so a slow source does not stretch the period.
    ///
    /// Stop is honoured at tick boundaries: an in-flight fetch is allowed
    /// to finish (bounded by the fetch timeout) and its result is then
    /// dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            trigger = %self.name,
            bucket = %self.request.bucket,
            interval_secs = self.interval.as_secs(),
            "polling loop started"
        );

        loop {
            let started = tokio::time::Instant::now();
            let result = self.fetch().await;
            if *shutdown.borrow() {
                debug!(trigger = %self.name, "stop requested, discarding in-flight sample");
                break;
            }
            self.apply(result).await;

            let delay = self.failures.next_delay();
            tokio::select! {
                _ = tokio::time::sleep_until(started + delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!(trigger = %self.name, "polling loop stopped");
    }

    async fn fetch(&self) -> Result<MetricSample, FetchError> {
        let fetch = self.source.fetch_count(&self.request);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(count)) => Ok(MetricSample::new(count, now())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
        }
    }

    async fn apply(&mut self, result: Result<MetricSample, FetchError>) -> TickOutcome {
        match result {
            Ok(sample) => {
                let prev_health = self.failures.health();
                let prev_failures = self.failures.consecutive_failures();
                let health = self.failures.record_success();
                if health != prev_health || prev_failures > 0 {
                    self.sink.report_health(&self.name, health, 0).await;
                }

                let decision = self.engine.evaluate(&sample);
                debug!(
                    trigger = %self.name,
                    count = sample.count,
                    desired = decision.desired_replicas,
                    reason = %decision.reason,
                    "decision"
                );
                self.sink.emit(&self.name, &decision).await;
                self.last_decision = Some(decision);
                TickOutcome::Decided(decision)
            }
            Err(e) => {
                let prev_health = self.failures.health();
                let health = self.failures.record_failure(&e);
                let failures = self.failures.consecutive_failures();

                if e.is_auth() {
                    error!(
                        trigger = %self.name,
                        failures,
                        retry_in_secs = self.failures.next_delay().as_secs(),
                        error = %e,
                        "metric fetch rejected"
                    );
                } else {
                    warn!(
                        trigger = %self.name,
                        failures,
                        retry_in_secs = self.failures.next_delay().as_secs(),
                        error = %e,
                        "metric fetch failed, keeping previous decision"
                    );
                }
                if health != prev_health && health == TriggerHealth::Degraded {
                    warn!(trigger = %self.name, "trigger reported degraded");
                }
                self.sink.report_health(&self.name, health, failures).await;
                TickOutcome::Failed(e)
            }
        }
    }

    /// The decision currently in force, if any tick has succeeded.
    pub fn last_decision(&self) -> Option<&ScalingDecision> {
        self.last_decision.as_ref()
    }

    pub fn health(&self) -> TriggerHealth {
        self.failures.health()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.consecutive_failures()
    }

    pub fn next_delay(&self) -> Duration {
        self.failures.next_delay()
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

/// Current time from the tokio clock, so paused-time tests drive the
/// cooldown window too.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
