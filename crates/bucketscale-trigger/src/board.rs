//! In-memory board of the latest decision per trigger.
//!
//! This is the sink the daemon uses; the API crate reads it to serve
//! JSON status and Prometheus gauges.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bucketscale_core::{DecisionReason, ScalingDecision, ScalingRule, TriggerHealth};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::sink::{DecisionSink, SinkFuture};

/// What an orchestrator sees for one trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStatus {
    pub name: String,
    pub bucket: String,
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// `None` until the first successful tick.
    pub desired_replicas: Option<u32>,
    pub reason: Option<DecisionReason>,
    pub sample_count: Option<u64>,
    pub health: TriggerHealth,
    pub consecutive_failures: u32,
    /// Epoch seconds of the last change.
    pub updated_at: u64,
}

/// Cheap to clone; all clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct DecisionBoard {
    entries: Arc<RwLock<HashMap<String, TriggerStatus>>>,
}

impl DecisionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, trigger: &str) -> Option<TriggerStatus> {
        self.entries.read().await.get(trigger).cloned()
    }

    /// All statuses ordered by trigger name.
    pub async fn list(&self) -> Vec<TriggerStatus> {
        let entries = self.entries.read().await;
        let mut statuses: Vec<_> = entries.values().cloned().collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}

impl DecisionSink for DecisionBoard {
    fn attach<'a>(&'a self, trigger: &'a str, rule: &'a ScalingRule) -> SinkFuture<'a> {
        Box::pin(async move {
            let status = TriggerStatus {
                name: trigger.to_string(),
                bucket: rule.bucket().to_string(),
                min_replicas: rule.min_replicas(),
                max_replicas: rule.max_replicas(),
                desired_replicas: None,
                reason: None,
                sample_count: None,
                health: TriggerHealth::Unknown,
                consecutive_failures: 0,
                updated_at: epoch_secs(),
            };
            self.entries.write().await.insert(trigger.to_string(), status);
        })
    }

    fn emit<'a>(&'a self, trigger: &'a str, decision: &'a ScalingDecision) -> SinkFuture<'a> {
        Box::pin(async move {
            let mut entries = self.entries.write().await;
            if let Some(status) = entries.get_mut(trigger) {
                status.desired_replicas = Some(decision.desired_replicas);
                status.reason = Some(decision.reason);
                status.sample_count = Some(decision.sample_count);
                status.updated_at = epoch_secs();
            }
        })
    }

    fn report_health<'a>(
        &'a self,
        trigger: &'a str,
        health: TriggerHealth,
        consecutive_failures: u32,
    ) -> SinkFuture<'a> {
        Box::pin(async move {
            let mut entries = self.entries.write().await;
            if let Some(status) = entries.get_mut(trigger) {
                status.health = health;
                status.consecutive_failures = consecutive_failures;
                status.updated_at = epoch_secs();
            }
        })
    }

    fn retire<'a>(&'a self, trigger: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            self.entries.write().await.remove(trigger);
        })
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
