use fleetops_common::{Job, JobHandle, JobResult, RemoteResource};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::error::{OrchestrationError, UnsupportedOperation, ValidationError};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout_seconds: u64,
    pub interval_seconds: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
            interval_seconds: 5,
        }
    }
}

impl WaitOptions {
    pub fn new(timeout_seconds: u64, interval_seconds: u64) -> Self {
        Self {
            timeout_seconds,
            interval_seconds,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.poll_timeout_seconds, config.poll_interval_seconds)
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Polls a job until it reaches a terminal state or the wait deadline passes.
///
/// Polls for one handle are strictly sequential. The deadline is wall-clock
/// time measured from the first poll.
pub struct JobPoller {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    job_uri_prefixes: Vec<String>,
    schedules_endpoint: String,
    activities_endpoint: String,
    shutdown_rx: Option<watch::Receiver<()>>,
}

impl JobPoller {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        let job_uri_prefixes = config
            .job_uri_prefixes
            .iter()
            .map(|prefix| {
                if prefix.ends_with('/') {
                    prefix.clone()
                } else {
                    format!("{prefix}/")
                }
            })
            .collect();

        Self {
            transport,
            clock,
            job_uri_prefixes,
            schedules_endpoint: config.schedules_endpoint.trim_end_matches('/').to_string(),
            activities_endpoint: config.activities_endpoint.clone(),
            shutdown_rx: None,
        }
    }

    /// Lets a shutdown signal end an in-progress wait during its sleep.
    pub fn with_shutdown(mut self, shutdown_rx: watch::Receiver<()>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Resolves a handle to the job URI it names, without any I/O.
    pub fn job_uri(&self, handle: &JobHandle) -> Result<String, OrchestrationError> {
        let uri = match handle {
            JobHandle::Resource(RemoteResource::Schedule(schedule)) => {
                return Err(UnsupportedOperation::WaitOnSchedule(schedule.resource_uri.clone()).into());
            }
            JobHandle::Resource(RemoteResource::Job(job)) => job.resource_uri.as_str(),
            JobHandle::Uri(uri) => uri.as_str(),
        };

        let path = uri_path(uri);
        if path == self.schedules_endpoint || path.starts_with(&format!("{}/", self.schedules_endpoint)) {
            return Err(UnsupportedOperation::WaitOnSchedule(uri.to_string()).into());
        }

        let is_job = self.job_uri_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|id| !id.is_empty() && !id.contains(['/', '?', '#']))
        });
        if !is_job {
            return Err(ValidationError::InvalidJobHandle(uri.to_string()).into());
        }
        Ok(uri.to_string())
    }

    /// Fetches the current state of a job.
    pub async fn fetch(&self, uri: &str) -> Result<Job, OrchestrationError> {
        let value = self.transport.get(uri).await?;
        Ok(serde_json::from_value(value)?)
    }

    #[instrument(skip(self, handle), fields(timeout = options.timeout_seconds, interval = options.interval_seconds))]
    pub async fn wait(&self, handle: impl Into<JobHandle> + Send, options: WaitOptions) -> Result<JobResult, OrchestrationError> {
        let uri = self.job_uri(&handle.into())?;
        let mut shutdown_rx = self.shutdown_rx.clone();
        let timeout_millis = i64::try_from(options.timeout_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        let interval = Duration::from_secs(options.interval_seconds);
        let start_time = self.clock.now();
        let mut polls: u32 = 0;

        loop {
            let job = self.fetch(&uri).await?;
            polls += 1;
            let elapsed = self.clock.now() - start_time;

            if job.state.is_terminal() {
                info!(
                    job_uri = %uri,
                    state = %job.state,
                    result_code = ?job.result_code,
                    polls,
                    "Job reached a terminal state."
                );
                let message = self.activity_message(&job.resource_uri).await;
                return Ok(JobResult::from_job(&job).with_message(message));
            }

            if elapsed.num_milliseconds() >= timeout_millis {
                warn!(job_uri = %uri, state = %job.state, polls, "Timed out waiting for job.");
                return Err(OrchestrationError::Timeout {
                    uri,
                    elapsed_seconds: elapsed.num_seconds(),
                });
            }

            let percent = if timeout_millis > 0 {
                (elapsed.num_milliseconds().saturating_mul(100) / timeout_millis).min(100)
            } else {
                100
            };
            debug!(job_uri = %uri, state = %job.state, percent, "Job still in progress.");

            if self.pause(interval, &mut shutdown_rx).await {
                warn!(job_uri = %uri, "Shutdown requested while waiting for job.");
                return Err(OrchestrationError::Interrupted(uri));
            }
        }
    }

    /// Sleeps one interval. Returns true if a shutdown signal cut the sleep short.
    async fn pause(&self, interval: Duration, shutdown_rx: &mut Option<watch::Receiver<()>>) -> bool {
        let Some(rx) = shutdown_rx.as_mut() else {
            self.clock.sleep(interval).await;
            return false;
        };

        let signalled = tokio::select! {
            _ = self.clock.sleep(interval) => return false,
            changed = rx.changed() => changed.is_ok(),
        };
        if signalled {
            return true;
        }
        // Sender is gone; nobody can ask us to stop any more.
        *shutdown_rx = None;
        self.clock.sleep(interval).await;
        false
    }

    /// Best-effort lookup of the activity message attached to a finished job.
    async fn activity_message(&self, job_uri: &str) -> Option<String> {
        let uri = activity_query_uri(&self.activities_endpoint, job_uri);
        match self.transport.get(&uri).await {
            Ok(body) => first_activity_message(&body),
            Err(e) => {
                debug!(job_uri = %job_uri, error = %e, "No activity message available for job.");
                None
            }
        }
    }
}

pub(crate) fn activity_query_uri(activities_endpoint: &str, job_uri: &str) -> String {
    let filter = format!("source/resourceUri eq '{job_uri}'");
    format!("{}?filter={}", activities_endpoint, urlencoding::encode(&filter))
}

fn first_activity_message(body: &Value) -> Option<String> {
    let item = body.get("items")?.as_array()?.first()?;
    ["formattedMessage", "message"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Path component of a relative or absolute URI.
fn uri_path(uri: &str) -> &str {
    match uri.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
        None => uri,
    }
}
