use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Lifecycle state of a remote job. `Complete`, `Error` and `Stalled` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Complete,
    Error,
    Stalled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Complete | JobState::Error | JobState::Stalled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Complete => "COMPLETE",
            JobState::Error => "ERROR",
            JobState::Stalled => "STALLED",
        }
    }
}

impl FromStr for JobState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobState::Pending),
            "RUNNING" => Ok(JobState::Running),
            "COMPLETE" => Ok(JobState::Complete),
            "ERROR" => Ok(JobState::Error),
            "STALLED" => Ok(JobState::Stalled),
            _ => Err(()),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    Failure,
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Success => f.write_str("SUCCESS"),
            ResultCode::Failure => f.write_str("FAILURE"),
        }
    }
}

/// Local mirror of a remote job resource. Only ever refreshed by re-fetching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "uri")]
    pub resource_uri: String,
    pub state: JobState,
    #[serde(default)]
    pub result_code: Option<ResultCode>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub associated_resource_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Parameters the job was submitted with.
    #[serde(default, alias = "data")]
    pub job_params: Option<Map<String, Value>>,
}

impl Job {
    /// True when the job was submitted as a parallel group operation.
    pub fn is_parallel(&self) -> bool {
        self.job_params
            .as_ref()
            .and_then(|params| params.get("parallel"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Seconds between creation and last update, or 0 when either is unknown.
    pub fn duration_seconds(&self) -> i64 {
        match (self.created_at, self.updated_at) {
            (Some(created), Some(updated)) => (updated - created).num_seconds(),
            _ => 0,
        }
    }
}

/// Outcome of waiting on (or otherwise observing) a job.
///
/// A job that ended in `Error` or `Stalled` is still a successfully retrieved
/// result; interpreting `result_code = Failure` is up to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job_uri: String,
    pub state: JobState,
    pub result_code: Option<ResultCode>,
    pub duration_seconds: i64,
    pub associated_resource_id: Option<String>,
    pub message: Option<String>,
}

impl JobResult {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_uri: job.resource_uri.clone(),
            state: job.state,
            result_code: job.result_code,
            duration_seconds: job.duration_seconds(),
            associated_resource_id: job.associated_resource_id.clone(),
            message: job.message.clone(),
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        if message.is_some() {
            self.message = message;
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Complete && self.result_code == Some(ResultCode::Success)
    }
}
