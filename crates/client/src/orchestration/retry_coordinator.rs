use fleetops_common::JobResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::OrchestrationError;

const NOT_IN_CORRECT_STATE: &str = "not in correct state";

/// Result of a read that may have needed a collection job first.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionRead<T> {
    Data(T),
    /// The prerequisite collection could not be produced. Not an error.
    NoData { warning: String },
}

impl<T> CollectionRead<T> {
    pub fn data(self) -> Option<T> {
        match self {
            CollectionRead::Data(value) => Some(value),
            CollectionRead::NoData { .. } => None,
        }
    }
}

/// Runs the single sanctioned retry: a read that failed because derived data
/// has not been collected yet triggers one collection job and one re-read.
pub struct RetryCoordinator {
    clock: Arc<dyn Clock>,
    settle_delay: Duration,
}

impl RetryCoordinator {
    pub fn new(clock: Arc<dyn Clock>, settle_delay: Duration) -> Self {
        Self { clock, settle_delay }
    }

    pub async fn read_with_collection_fallback<T, P, PF, S, C, CF, R, RF>(
        &self,
        primary_read: P,
        is_collection_missing: S,
        trigger_collection_job: C,
        retry_read: R,
    ) -> Result<CollectionRead<T>, OrchestrationError>
    where
        P: FnOnce() -> PF,
        PF: Future<Output = Result<T, OrchestrationError>>,
        S: FnOnce(&OrchestrationError) -> bool,
        C: FnOnce() -> CF,
        CF: Future<Output = Result<JobResult, OrchestrationError>>,
        R: FnOnce() -> RF,
        RF: Future<Output = Result<T, OrchestrationError>>,
    {
        let err = match primary_read().await {
            Ok(value) => return Ok(CollectionRead::Data(value)),
            Err(err) => err,
        };
        if !is_collection_missing(&err) {
            return Err(err);
        }

        info!(error = %err, "Data not collected yet, running collection job.");
        let result = match trigger_collection_job().await {
            Ok(result) => result,
            Err(err) if err.is_timeout() => {
                let warning = format!("Collection job did not finish in time: {err}");
                warn!("{}", warning);
                return Ok(CollectionRead::NoData { warning });
            }
            Err(err) => return Err(err),
        };

        if let Some(warning) = collection_failure(&result) {
            warn!(job_uri = %result.job_uri, state = %result.state, "{}", warning);
            return Ok(CollectionRead::NoData { warning });
        }

        self.clock.sleep(self.settle_delay).await;
        retry_read().await.map(CollectionRead::Data)
    }

    /// Same as [`Self::read_with_collection_fallback`], detecting the signal from
    /// the transport's error classification.
    pub async fn read_or_collect<T, P, PF, C, CF, R, RF>(
        &self,
        primary_read: P,
        trigger_collection_job: C,
        retry_read: R,
    ) -> Result<CollectionRead<T>, OrchestrationError>
    where
        P: FnOnce() -> PF,
        PF: Future<Output = Result<T, OrchestrationError>>,
        C: FnOnce() -> CF,
        CF: Future<Output = Result<JobResult, OrchestrationError>>,
        R: FnOnce() -> RF,
        RF: Future<Output = Result<T, OrchestrationError>>,
    {
        self.read_with_collection_fallback(
            primary_read,
            OrchestrationError::is_collection_missing,
            trigger_collection_job,
            retry_read,
        )
        .await
    }
}

fn collection_failure(result: &JobResult) -> Option<String> {
    let detail = result.message.as_deref().unwrap_or("no details");
    if detail.to_lowercase().contains(NOT_IN_CORRECT_STATE) {
        return Some(format!("Resource is not in a state that allows data collection: {detail}"));
    }
    if !result.is_success() {
        return Some(format!(
            "Collection job {} ended {} without success: {detail}",
            result.job_uri, result.state
        ));
    }
    None
}
