use serde::{Deserialize, Serialize};

use crate::job::Job;
use crate::schedule::Schedule;

/// A job or schedule payload, discriminated once by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemoteResource {
    #[serde(rename = "compute-ops-mgmt/job", alias = "compute-ops/job")]
    Job(Job),
    #[serde(rename = "compute-ops-mgmt/schedule", alias = "compute-ops/schedule")]
    Schedule(Schedule),
}

impl RemoteResource {
    pub fn resource_uri(&self) -> &str {
        match self {
            RemoteResource::Job(job) => &job.resource_uri,
            RemoteResource::Schedule(schedule) => &schedule.resource_uri,
        }
    }
}

/// Anything a caller may hand to the job poller.
#[derive(Debug, Clone, PartialEq)]
pub enum JobHandle {
    Uri(String),
    Resource(RemoteResource),
}

impl From<&str> for JobHandle {
    fn from(uri: &str) -> Self {
        JobHandle::Uri(uri.to_string())
    }
}

impl From<String> for JobHandle {
    fn from(uri: String) -> Self {
        JobHandle::Uri(uri)
    }
}

impl From<Job> for JobHandle {
    fn from(job: Job) -> Self {
        JobHandle::Resource(RemoteResource::Job(job))
    }
}

impl From<&Job> for JobHandle {
    fn from(job: &Job) -> Self {
        JobHandle::Resource(RemoteResource::Job(job.clone()))
    }
}

impl From<Schedule> for JobHandle {
    fn from(schedule: Schedule) -> Self {
        JobHandle::Resource(RemoteResource::Schedule(schedule))
    }
}

impl From<RemoteResource> for JobHandle {
    fn from(resource: RemoteResource) -> Self {
        JobHandle::Resource(resource)
    }
}
