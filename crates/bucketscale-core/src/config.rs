//! Trigger definitions file parser.
//!
//! Keys mirror the ScaledObject vocabulary (`pollingInterval`,
//! `cooldownPeriod`, `maxReplicaCount`, `triggers[].metadata`), so a
//! definition can be lifted from an existing manifest with little
//! editing.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::rule::{CredentialRef, ScalingRule};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggersFile {
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default)]
    pub triggers: Vec<TriggerDefinition>,
}

/// Settings shared by every polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSettings {
    /// Ceiling for the exponential backoff after fetch failures.
    #[serde(default = "default_max_backoff_seconds")]
    pub max_backoff_seconds: u64,
    /// Consecutive credential rejections at which a trigger is reported
    /// degraded; the threshold is inclusive. Must be at least 1.
    #[serde(default = "default_degraded_after_failures")]
    pub degraded_after_failures: u32,
    /// Fetch timeout; never longer than a trigger's polling interval.
    /// Must be at least 1 when set.
    pub fetch_timeout_seconds: Option<u64>,
}

impl ControllerSettings {
    /// Reject settings under which no fetch could ever succeed or health
    /// could never be reported.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.fetch_timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "fetchTimeoutSeconds",
                value: "0".to_string(),
            });
        }
        if self.degraded_after_failures == 0 {
            return Err(ConfigError::InvalidValue {
                field: "degradedAfterFailures",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_backoff_seconds: default_max_backoff_seconds(),
            degraded_after_failures: default_degraded_after_failures(),
            fetch_timeout_seconds: None,
        }
    }
}

fn default_max_backoff_seconds() -> u64 {
    60
}

fn default_degraded_after_failures() -> u32 {
    3
}

/// One trigger binding a bucket to a scalable workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDefinition {
    pub name: String,
    #[serde(alias = "pollingIntervalSeconds")]
    pub polling_interval: i64,
    #[serde(alias = "cooldownPeriodSeconds")]
    pub cooldown_period: i64,
    #[serde(default)]
    pub min_replica_count: i64,
    pub max_replica_count: i64,
    pub metadata: TriggerMetadata,
}

/// The `metadata` block of a bucket trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMetadata {
    #[serde(alias = "bucketIdentifier")]
    pub bucket_name: String,
    pub target_object_count: MetadataInt,
    pub credentials_from_env: Option<String>,
    pub blob_prefix: Option<String>,
}

/// Metadata values are strings in manifests (`targetObjectCount: '5'`),
/// so both forms are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataInt {
    Int(i64),
    Text(String),
}

impl MetadataInt {
    fn parse(&self, field: &'static str) -> ConfigResult<i64> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Text(s) => s.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field,
                value: s.clone(),
            }),
        }
    }
}

impl From<i64> for MetadataInt {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl TriggerDefinition {
    /// Validate the definition into an immutable rule.
    pub fn to_rule(&self) -> ConfigResult<ScalingRule> {
        let target = self.metadata.target_object_count.parse("targetObjectCount")?;
        let mut rule = ScalingRule::new(
            self.metadata.bucket_name.clone(),
            target,
            self.min_replica_count,
            self.max_replica_count,
            self.polling_interval,
            self.cooldown_period,
        )?;

        if let Some(prefix) = &self.metadata.blob_prefix {
            rule = rule.with_blob_prefix(prefix.clone());
        }
        if let Some(var) = &self.metadata.credentials_from_env {
            if var.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "credentialsFromEnv",
                    value: var.clone(),
                });
            }
            rule = rule.with_credentials(CredentialRef::FromEnv(var.clone()));
        }
        Ok(rule)
    }
}

impl TriggersFile {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse and validate every trigger; the first invalid one fails the
    /// whole file.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let file: TriggersFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        file.controller.validate()?;
        file.rules()?;
        Ok(file)
    }

    /// Validated rules keyed by trigger name, in file order.
    pub fn rules(&self) -> ConfigResult<Vec<(String, ScalingRule)>> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(self.triggers.len());
        for def in &self.triggers {
            if def.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "name",
                    value: def.name.clone(),
                });
            }
            if !seen.insert(def.name.as_str()) {
                return Err(ConfigError::DuplicateTrigger(def.name.clone()));
            }
            let rule = def.to_rule().map_err(|e| ConfigError::Trigger {
                name: def.name.clone(),
                source: Box::new(e),
            })?;
            rules.push((def.name.clone(), rule));
        }
        Ok(rules)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
