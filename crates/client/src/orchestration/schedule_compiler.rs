use chrono::{DateTime, Utc};
use fleetops_common::{ResourceTarget, ScheduleDefinition, SchedulePayload, SchedulePurpose, ScheduledOperation};
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::templates::JobTemplate;

/// Turns a deferred job submission into a schedule resource body.
///
/// The remote scheduler replays the embedded operation (a POST to the jobs
/// endpoint) at `startAt` and then every `interval`, if one is set.
#[derive(Debug, Clone)]
pub struct ScheduleCompiler {
    jobs_endpoint: String,
}

impl ScheduleCompiler {
    pub fn new(jobs_endpoint: impl Into<String>) -> Self {
        Self {
            jobs_endpoint: jobs_endpoint.into(),
        }
    }

    pub fn compile(
        &self,
        purpose: SchedulePurpose,
        target: &ResourceTarget,
        template: &JobTemplate,
        parameters: Map<String, Value>,
        start_at: DateTime<Utc>,
        interval: Option<String>,
    ) -> SchedulePayload {
        let description = format!(
            "Scheduled {} of '{}' ({})",
            template.name,
            target.label(),
            purpose
        );

        SchedulePayload {
            name: schedule_name(target.label(), purpose),
            description,
            purpose,
            associated_resource_uri: target.resource_uri.clone(),
            schedule: ScheduleDefinition { start_at, interval },
            operation: ScheduledOperation {
                kind: "REST".to_string(),
                method: "POST".to_string(),
                uri: self.jobs_endpoint.clone(),
                body: json!({
                    "jobTemplateUri": template.resource_uri,
                    "resourceUri": target.resource_uri,
                    "data": parameters,
                }),
            },
        }
    }
}

/// `<target>_<purpose>_Schedule_<6 random digits>`. The random token only makes
/// collisions unlikely; the remote service still has the final say.
fn schedule_name(target_label: &str, purpose: SchedulePurpose) -> String {
    let token: u32 = rand::rng().random_range(100_000..1_000_000);
    format!("{}_{}_Schedule_{}", target_label, purpose.name_fragment(), token)
}
