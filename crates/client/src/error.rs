use thiserror::Error;

use crate::transport::{TransportError, TransportErrorKind};

/// Input problems caught before any network call. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Schedule time {0} is outside the allowed window (now to now + 1 year)")]
    ScheduleWindowExceeded(String),
    #[error("Invalid interval '{0}': expected an ISO-8601 period between PT15M and P1Y")]
    InvalidInterval(String),
    #[error("Invalid job handle: {0}")]
    InvalidJobHandle(String),
    #[error("No eligible members in group '{0}'")]
    NoEligibleMembers(String),
    #[error("Per-member timeout must be greater than zero")]
    InvalidTimeout,
    #[error("Unknown job template: {0}")]
    UnknownTemplate(String),
    #[error("A scheduled operation requires a schedule purpose")]
    MissingSchedulePurpose,
    #[error("A scheduled operation requires a schedule time")]
    MissingScheduleTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedOperation {
    #[error("Job {0} is already complete and cannot be cancelled")]
    AlreadyComplete(String),
    #[error("Job {0} runs in parallel mode; only serial jobs can be cancelled")]
    ParallelNotCancellable(String),
    #[error("Waiting on schedule {0} is not supported; only jobs can be awaited")]
    WaitOnSchedule(String),
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Operation timeout: job {uri} did not reach a terminal state within {elapsed_seconds}s")]
    Timeout { uri: String, elapsed_seconds: i64 },
    #[error("Unsupported operation: {0}")]
    Unsupported(#[from] UnsupportedOperation),
    #[error("Transport error: {0}")]
    Transport(TransportError),
    #[error("Wait on {0} was interrupted by a shutdown signal")]
    Interrupted(String),
    #[error("Unexpected payload from remote service: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TransportError> for OrchestrationError {
    fn from(err: TransportError) -> Self {
        match err.kind() {
            TransportErrorKind::NotFound => OrchestrationError::NotFound(err.to_string()),
            _ => OrchestrationError::Transport(err),
        }
    }
}

impl OrchestrationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, OrchestrationError::Timeout { .. })
    }

    /// True when the remote service asked for a collection job before this read.
    pub fn is_collection_missing(&self) -> bool {
        matches!(
            self,
            OrchestrationError::Transport(err) if err.kind() == TransportErrorKind::CollectionMissing
        )
    }
}
