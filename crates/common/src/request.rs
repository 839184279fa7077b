use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schedule::SchedulePurpose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecutionMode {
    #[default]
    Immediate,
    Scheduled,
}

/// The resource an operation acts on, as resolved by the lookup layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTarget {
    pub id: String,
    pub resource_type: String,
    pub resource_uri: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl ResourceTarget {
    /// Human label for the target: its name when known, otherwise its id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One mutating operation a caller wants performed, now or later.
///
/// Built per invocation and consumed once by the request builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    /// Job template name (e.g. `PowerOn.New`) or raw template id.
    pub template_id: String,
    pub target: ResourceTarget,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub schedule_time: Option<DateTime<Utc>>,
    /// ISO-8601 period, e.g. `P1W`.
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub purpose: Option<SchedulePurpose>,
    #[serde(default)]
    pub description: Option<String>,
}

impl OperationRequest {
    pub fn immediate(template_id: impl Into<String>, target: ResourceTarget) -> Self {
        Self {
            template_id: template_id.into(),
            target,
            parameters: Map::new(),
            execution_mode: ExecutionMode::Immediate,
            schedule_time: None,
            interval: None,
            purpose: None,
            description: None,
        }
    }

    pub fn scheduled(
        template_id: impl Into<String>,
        target: ResourceTarget,
        purpose: SchedulePurpose,
        schedule_time: DateTime<Utc>,
        interval: Option<String>,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            target,
            parameters: Map::new(),
            execution_mode: ExecutionMode::Scheduled,
            schedule_time: Some(schedule_time),
            interval,
            purpose: Some(purpose),
            description: None,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
