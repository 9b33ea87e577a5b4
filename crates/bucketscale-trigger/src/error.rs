//! Metric fetch errors.

use std::time::Duration;

use thiserror::Error;

/// Why a tick produced no sample. None of these end the polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("metric fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("metric source unreachable: {0}")]
    Network(String),

    #[error("metric source rate limited the request")]
    RateLimited,

    #[error("credentials rejected: {0}")]
    Auth(String),

    #[error("metric source error: {0}")]
    Source(String),
}

impl FetchError {
    /// Credential problems are retried like any other failure but count
    /// toward the degraded threshold.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
