//! Configuration errors.

use thiserror::Error;

/// Result type alias for rule construction and config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A trigger definition that can never be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bucket identifier must not be empty")]
    EmptyBucket,

    #[error("targetObjectCount must be > 0, got {0}")]
    NonPositiveTarget(i64),

    #[error("minReplicaCount must be >= 0, got {0}")]
    NegativeMinReplicas(i64),

    #[error("maxReplicaCount ({max}) must be greater than minReplicaCount ({min})")]
    MaxNotAboveMin { min: i64, max: i64 },

    #[error("pollingInterval must be > 0 seconds, got {0}")]
    NonPositiveInterval(i64),

    #[error("cooldownPeriod must be >= 0 seconds, got {0}")]
    NegativeCooldown(i64),

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("duplicate trigger name: {0}")]
    DuplicateTrigger(String),

    #[error("trigger {name}: {source}")]
    Trigger {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("failed to read trigger definitions: {0}")]
    Read(String),

    #[error("failed to parse trigger definitions: {0}")]
    Parse(String),
}
