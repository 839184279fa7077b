use fleetops_common::{ExecutionMode, OperationRequest, SchedulePayload};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::schedule_compiler::ScheduleCompiler;
use crate::clock::Clock;
use crate::error::ValidationError;
use crate::interval::{validate_interval, validate_schedule_time};
use crate::templates::JobTemplateCatalog;

/// Body POSTed to the jobs endpoint for an immediate operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    pub job_template: String,
    pub resource_id: String,
    pub resource_type: String,
    pub job_params: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPayload {
    Job(JobSubmission),
    Schedule(SchedulePayload),
}

/// Pure transform from an operation request to the payload the caller submits.
pub struct RequestBuilder {
    catalog: Arc<JobTemplateCatalog>,
    compiler: ScheduleCompiler,
    clock: Arc<dyn Clock>,
}

impl RequestBuilder {
    pub fn new(catalog: Arc<JobTemplateCatalog>, compiler: ScheduleCompiler, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, compiler, clock }
    }

    pub fn build(&self, request: OperationRequest) -> Result<SubmissionPayload, ValidationError> {
        let template = self.catalog.resolve(&request.template_id)?;

        match request.execution_mode {
            ExecutionMode::Immediate => {
                debug!(template = %template.name, resource = %request.target.id, "Building job submission.");
                Ok(SubmissionPayload::Job(JobSubmission {
                    job_template: template.id.clone(),
                    resource_id: request.target.id,
                    resource_type: request.target.resource_type,
                    job_params: request.parameters,
                }))
            }
            ExecutionMode::Scheduled => {
                let start_at = request.schedule_time.ok_or(ValidationError::MissingScheduleTime)?;
                validate_schedule_time(start_at, self.clock.now())?;
                if let Some(interval) = &request.interval {
                    validate_interval(interval)?;
                }
                let purpose = request.purpose.ok_or(ValidationError::MissingSchedulePurpose)?;

                debug!(template = %template.name, resource = %request.target.id, %purpose, "Building schedule.");
                let mut payload = self.compiler.compile(
                    purpose,
                    &request.target,
                    template,
                    request.parameters,
                    start_at,
                    request.interval,
                );
                if let Some(description) = request.description {
                    payload.description = description;
                }
                Ok(SubmissionPayload::Schedule(payload))
            }
        }
    }
}
