//! bucketscale-core — shared types for the object-count autoscaling trigger.
//!
//! Holds the data model that flows through a trigger on every tick
//! (`MetricSample` in, `ScalingDecision` out), the immutable
//! `ScalingRule` a trigger is created with, and the parser for the
//! trigger definitions file.

pub mod config;
pub mod error;
pub mod rule;
pub mod types;

pub use config::{ControllerSettings, TriggerDefinition, TriggerMetadata, TriggersFile};
pub use error::{ConfigError, ConfigResult};
pub use rule::{CredentialRef, ScalingRule};
pub use types::*;
