//! Decision sink seam — how decisions leave a trigger.

use std::future::Future;
use std::pin::Pin;

use bucketscale_core::{ScalingDecision, ScalingRule, TriggerHealth};

/// Boxed future returned by sink methods.
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Receives the output of every polling loop.
///
/// The orchestrator reconciling replica counts reads from an
/// implementation of this trait; the loops never read back from it.
pub trait DecisionSink: Send + Sync {
    /// A trigger was registered with `rule`.
    fn attach<'a>(&'a self, _trigger: &'a str, _rule: &'a ScalingRule) -> SinkFuture<'a> {
        Box::pin(async {})
    }

    /// A new decision was computed. Called once per successful tick, in
    /// tick order.
    fn emit<'a>(&'a self, trigger: &'a str, decision: &'a ScalingDecision) -> SinkFuture<'a>;

    /// Fetch health or the consecutive-failure count changed.
    fn report_health<'a>(
        &'a self,
        _trigger: &'a str,
        _health: TriggerHealth,
        _consecutive_failures: u32,
    ) -> SinkFuture<'a> {
        Box::pin(async {})
    }

    /// The trigger was deregistered; forget everything about it.
    fn retire<'a>(&'a self, _trigger: &'a str) -> SinkFuture<'a> {
        Box::pin(async {})
    }
}
