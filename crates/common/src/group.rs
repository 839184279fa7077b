use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named set of servers managed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub resource_uri: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

impl Group {
    pub fn contains(&self, member_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == member_id)
    }
}

/// How a group-wide operation is run on the remote side. Computed per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExecutionPlan {
    pub parallel: bool,
    pub batch_size: usize,
    /// Only honoured for serial runs.
    pub stop_on_failure: bool,
    pub member_ids: Vec<String>,
    pub per_member_timeout_seconds: u64,
}

impl GroupExecutionPlan {
    pub fn effective_stop_on_failure(&self) -> bool {
        !self.parallel && self.stop_on_failure
    }

    /// Ceiling the caller should give the poller for the whole group run.
    ///
    /// Serial runs add up one budget per member; parallel members share one.
    pub fn total_timeout_seconds(&self) -> u64 {
        if self.parallel {
            self.per_member_timeout_seconds
        } else {
            self
                .per_member_timeout_seconds
                .saturating_mul(self.member_ids.len() as u64)
        }
    }

    /// Job parameters describing this plan.
    pub fn to_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("parallel".to_string(), Value::Bool(self.parallel));
        params.insert(
            "stopOnFailure".to_string(),
            Value::Bool(self.effective_stop_on_failure()),
        );
        params.insert("batchSize".to_string(), Value::from(self.batch_size));
        params.insert(
            "devices".to_string(),
            Value::Array(self.member_ids.iter().cloned().map(Value::String).collect()),
        );
        params
    }

    /// Plan parameters with operation-specific fields (bundle id, reset flags, ...) merged in.
    /// Plan fields win on key collisions.
    pub fn merge_into(&self, operation_fields: Map<String, Value>) -> Map<String, Value> {
        let mut merged = operation_fields;
        merged.extend(self.to_parameters());
        merged
    }
}
