//! The validated, immutable configuration of a trigger.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Opaque reference to the credentials the metric source should use.
///
/// The core never resolves it; it is handed to the metric source as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialRef {
    /// Name of an environment variable holding the credential material.
    FromEnv(String),
}

/// Static scaling configuration of a single trigger.
///
/// Can only be built through [`ScalingRule::new`], so every instance
/// satisfies `target_object_count > 0`, `max_replicas > min_replicas`
/// and a non-zero polling interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingRule {
    bucket: String,
    target_object_count: u64,
    min_replicas: u32,
    max_replicas: u32,
    polling_interval: Duration,
    cooldown_period: Duration,
    blob_prefix: Option<String>,
    credentials: Option<CredentialRef>,
}

impl ScalingRule {
    /// Validate and build a rule.
    ///
    /// Inputs are signed so that negative values coming from a
    /// definitions file are reported as the specific violation.
    pub fn new(
        bucket: impl Into<String>,
        target_object_count: i64,
        min_replicas: i64,
        max_replicas: i64,
        polling_interval_secs: i64,
        cooldown_period_secs: i64,
    ) -> ConfigResult<Self> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if target_object_count <= 0 {
            return Err(ConfigError::NonPositiveTarget(target_object_count));
        }
        if min_replicas < 0 {
            return Err(ConfigError::NegativeMinReplicas(min_replicas));
        }
        if max_replicas <= min_replicas {
            return Err(ConfigError::MaxNotAboveMin {
                min: min_replicas,
                max: max_replicas,
            });
        }
        if polling_interval_secs <= 0 {
            return Err(ConfigError::NonPositiveInterval(polling_interval_secs));
        }
        if cooldown_period_secs < 0 {
            return Err(ConfigError::NegativeCooldown(cooldown_period_secs));
        }

        Ok(Self {
            bucket,
            target_object_count: target_object_count as u64,
            min_replicas: replica_count("minReplicaCount", min_replicas)?,
            max_replicas: replica_count("maxReplicaCount", max_replicas)?,
            polling_interval: Duration::from_secs(polling_interval_secs as u64),
            cooldown_period: Duration::from_secs(cooldown_period_secs as u64),
            blob_prefix: None,
            credentials: None,
        })
    }

    /// Only count objects whose key starts with `prefix`.
    pub fn with_blob_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.blob_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialRef) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Objects one replica is expected to handle.
    pub fn target_object_count(&self) -> u64 {
        self.target_object_count
    }

    pub fn min_replicas(&self) -> u32 {
        self.min_replicas
    }

    pub fn max_replicas(&self) -> u32 {
        self.max_replicas
    }

    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    pub fn cooldown_period(&self) -> Duration {
        self.cooldown_period
    }

    pub fn blob_prefix(&self) -> Option<&str> {
        self.blob_prefix.as_deref()
    }

    pub fn credentials(&self) -> Option<&CredentialRef> {
        self.credentials.as_ref()
    }
}

fn replica_count(field: &'static str, value: i64) -> ConfigResult<u32> {
    u32::try_from(value).map_err(|_| ConfigError::OutOfRange { field, value })
}
