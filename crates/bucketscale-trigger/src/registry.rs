//! Trigger registry — one polling loop per registered trigger.
//!
//! Each loop owns its rule and cooldown state; the registry only holds
//! the handle and stop signal needed to end it.

use std::collections::HashMap;
use std::sync::Arc;

use bucketscale_core::{ConfigResult, ScalingRule, TriggerDefinition};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::controller::{ControllerOptions, PollingController};
use crate::sink::DecisionSink;
use crate::source::MetricSource;

/// A running loop.
struct TriggerSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl TriggerSlot {
    /// Signal stop and wait for the loop to reach its tick boundary.
    async fn stop(self, name: &str) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(trigger = %name, error = %e, "polling loop ended abnormally");
        }
    }
}

pub struct TriggerRegistry {
    source: Arc<dyn MetricSource>,
    sink: Arc<dyn DecisionSink>,
    options: ControllerOptions,
    triggers: Arc<RwLock<HashMap<String, TriggerSlot>>>,
}

impl TriggerRegistry {
    pub fn new(
        source: Arc<dyn MetricSource>,
        sink: Arc<dyn DecisionSink>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            source,
            sink,
            options,
            triggers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Validate a definition and start its loop.
    ///
    /// An invalid definition is rejected before anything is spawned.
    pub async fn register(&self, definition: &TriggerDefinition) -> ConfigResult<()> {
        let rule = definition.to_rule()?;
        self.register_rule(&definition.name, rule).await;
        Ok(())
    }

    /// Start a loop for an already validated rule, replacing any loop
    /// registered under the same name.
    ///
    /// The table stays write-locked until the new loop is in place, so
    /// concurrent registrations of one name run one after the other and
    /// never leave two loops behind.
    pub async fn register_rule(&self, name: &str, rule: ScalingRule) {
        let mut triggers = self.triggers.write().await;
        if let Some(old) = triggers.remove(name) {
            debug!(trigger = %name, "replacing running trigger");
            old.stop(name).await;
        }

        self.sink.attach(name, &rule).await;

        let bucket = rule.bucket().to_string();
        let controller = PollingController::new(
            name,
            rule,
            self.source.clone(),
            self.sink.clone(),
            &self.options,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(controller.run(shutdown_rx));

        triggers.insert(
            name.to_string(),
            TriggerSlot {
                handle,
                shutdown_tx,
            },
        );
        drop(triggers);

        info!(trigger = %name, %bucket, "trigger registered");
    }

    /// Stop a trigger's loop and drop its state. Returns `false` if no
    /// such trigger was registered.
    pub async fn deregister(&self, name: &str) -> bool {
        let slot = self.triggers.write().await.remove(name);
        match slot {
            Some(slot) => {
                slot.stop(name).await;
                self.sink.retire(name).await;
                info!(trigger = %name, "trigger deregistered");
                true
            }
            None => false,
        }
    }

    /// Stop every loop (for graceful shutdown).
    pub async fn stop_all(&self) {
        let slots: Vec<_> = self.triggers.write().await.drain().collect();
        for (name, slot) in slots {
            slot.stop(&name).await;
            self.sink.retire(&name).await;
            debug!(trigger = %name, "trigger stopped");
        }
        info!("all triggers stopped");
    }

    /// Names of registered triggers, sorted.
    pub async fn active_triggers(&self) -> Vec<String> {
        let triggers = self.triggers.read().await;
        let mut names: Vec<_> = triggers.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn is_registered(&self, name: &str) -> bool {
        self.triggers.read().await.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use bucketscale_core::{ConfigError, DecisionReason, TriggerHealth, TriggersFile};

    use crate::board::DecisionBoard;
    use crate::controller::tests::{Event, RecordingSink, ScriptedSource, Step, gcs_rule};

    const DEFINITIONS: &str = r#"
[[triggers]]
name = "dummy-consumer"
pollingInterval = 5
maxReplicaCount = 3
cooldownPeriod = 10

[triggers.metadata]
bucketName = "keda-test-storage-bucket"
targetObjectCount = '5'
"#;

    fn definition() -> TriggerDefinition {
        TriggersFile::parse(DEFINITIONS).unwrap().triggers.remove(0)
    }

    #[tokio::test(start_paused = true)]
    async fn register_and_deregister() {
        let source = ScriptedSource::new(vec![Step::Count(30)]);
        let sink = Arc::new(RecordingSink::default());
        let registry = TriggerRegistry::new(source, sink.clone(), ControllerOptions::default());

        assert!(registry.active_triggers().await.is_empty());
        registry.register(&definition()).await.unwrap();
        assert!(registry.is_registered("dummy-consumer").await);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(registry.deregister("dummy-consumer").await);
        assert!(!registry.is_registered("dummy-consumer").await);
        assert!(!registry.deregister("dummy-consumer").await);

        let events = sink.events();
        assert_eq!(events.first(), Some(&Event::Attached("dummy-consumer".into())));
        assert!(events.contains(&Event::Decision(
            "dummy-consumer".into(),
            3,
            DecisionReason::Demand
        )));
        assert_eq!(events.last(), Some(&Event::Retired("dummy-consumer".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_definition_is_fatal_and_spawns_nothing() {
        let source = ScriptedSource::new(vec![]);
        let sink = Arc::new(RecordingSink::default());
        let registry = TriggerRegistry::new(source.clone(), sink.clone(), ControllerOptions::default());

        let mut def = definition();
        def.max_replica_count = 0;
        let err = registry.register(&def).await.unwrap_err();
        assert_eq!(err, ConfigError::MaxNotAboveMin { min: 0, max: 0 });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(registry.active_triggers().await.is_empty());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn re_register_replaces_loop() {
        let source = ScriptedSource::new(vec![Step::Count(30)]);
        let sink = Arc::new(RecordingSink::default());
        let registry = TriggerRegistry::new(source, sink, ControllerOptions::default());

        registry.register_rule("worker", gcs_rule()).await;
        registry.register_rule("worker", gcs_rule()).await;
        assert_eq!(registry.active_triggers().await, vec!["worker"]);

        registry.stop_all().await;
        assert!(registry.active_triggers().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_registrations_leave_one_loop() {
        let source = ScriptedSource::new(vec![Step::Slow(Duration::from_secs(1), 30)]);
        let sink = Arc::new(RecordingSink::default());
        let registry = TriggerRegistry::new(source.clone(), sink, ControllerOptions::default());

        tokio::join!(
            registry.register_rule("worker", gcs_rule()),
            registry.register_rule("worker", gcs_rule()),
        );
        assert_eq!(registry.active_triggers().await, vec!["worker"]);

        // Run long enough for several ticks of whichever loop survived.
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);

        registry.stop_all().await;
        let fetches = source.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), fetches);
    }

    #[tokio::test(start_paused = true)]
    async fn triggers_run_independently() {
        let source = ScriptedSource::new(vec![Step::Count(30)]);
        let board = DecisionBoard::new();
        let registry = TriggerRegistry::new(
            source,
            Arc::new(board.clone()),
            ControllerOptions::default(),
        );

        registry.register_rule("worker-a", gcs_rule()).await;
        let wide = ScalingRule::new("keda-test-storage-bucket", 5, 0, 10, 5, 10).unwrap();
        registry.register_rule("worker-b", wide).await;

        tokio::time::sleep(Duration::from_secs(1)).await;

        let a = board.get("worker-a").await.unwrap();
        let b = board.get("worker-b").await.unwrap();
        assert_eq!(a.desired_replicas, Some(3));
        assert_eq!(b.desired_replicas, Some(6));
        assert_eq!(a.health, TriggerHealth::Healthy);

        registry.stop_all().await;
        assert!(board.list().await.is_empty());
    }
}
