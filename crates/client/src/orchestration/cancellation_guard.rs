use fleetops_common::{Job, JobHandle, JobResult, JobState};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{OrchestrationError, UnsupportedOperation};
use crate::orchestration::job_poller::{JobPoller, WaitOptions};
use crate::transport::Transport;

/// Asks the remote service to stop a serial job. It never forces a transition.
pub struct CancellationGuard {
    transport: Arc<dyn Transport>,
    poller: Arc<JobPoller>,
}

impl CancellationGuard {
    pub fn new(transport: Arc<dyn Transport>, poller: Arc<JobPoller>) -> Self {
        Self { transport, poller }
    }

    #[instrument(skip(self, job), fields(job_uri = %job.resource_uri, state = %job.state))]
    pub async fn cancel(&self, job: &Job, wait: Option<WaitOptions>) -> Result<JobResult, OrchestrationError> {
        if job.state == JobState::Complete {
            return Err(UnsupportedOperation::AlreadyComplete(job.resource_uri.clone()).into());
        }
        if job.is_parallel() {
            return Err(UnsupportedOperation::ParallelNotCancellable(job.resource_uri.clone()).into());
        }
        let uri = self.poller.job_uri(&JobHandle::from(job))?;

        let response = self
            .transport
            .patch(&uri, &json!({ "input": { "stopOnRequest": true } }))
            .await?;
        info!("Stop requested for job.");

        if let Some(options) = wait {
            return self.poller.wait(uri, options).await;
        }

        // Some API versions answer the PATCH with an empty body.
        let updated = if response.is_null() {
            job.clone()
        } else {
            serde_json::from_value::<Job>(response)?
        };
        Ok(JobResult::from_job(&updated))
    }

    /// Fetches the job first so its state and parameters can be checked.
    pub async fn cancel_by_uri(&self, uri: &str, wait: Option<WaitOptions>) -> Result<JobResult, OrchestrationError> {
        let uri = self.poller.job_uri(&JobHandle::from(uri))?;
        let job = self.poller.fetch(&uri).await?;
        self.cancel(&job, wait).await
    }
}
