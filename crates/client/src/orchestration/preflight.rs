use async_trait::async_trait;
use fleetops_common::OperationRequest;
use std::sync::Arc;
use tracing::info;

use crate::error::OrchestrationError;
use crate::lookup::{PowerState, ResourceLookup};
use crate::templates::JobTemplateCatalog;

/// Check run before any payload is built. `Ok(Some(message))` means the
/// operation is pointless and must be skipped.
#[async_trait]
pub trait Preflight: Send + Sync {
    async fn check(&self, request: &OperationRequest) -> Result<Option<String>, OrchestrationError>;
}

/// Skips power operations that would not change anything.
///
/// Templates are matched by canonical name, so requests naming a raw template id
/// are recognised too.
pub struct PowerStatePreflight {
    lookup: Arc<dyn ResourceLookup>,
    catalog: Arc<JobTemplateCatalog>,
}

impl PowerStatePreflight {
    pub fn new(lookup: Arc<dyn ResourceLookup>, catalog: Arc<JobTemplateCatalog>) -> Self {
        Self { lookup, catalog }
    }
}

#[async_trait]
impl Preflight for PowerStatePreflight {
    async fn check(&self, request: &OperationRequest) -> Result<Option<String>, OrchestrationError> {
        // Unknown templates are reported by the request builder.
        let Ok(template) = self.catalog.resolve(&request.template_id) else {
            return Ok(None);
        };
        let skip_when = match template.name.to_ascii_lowercase().as_str() {
            "poweron.new" => (PowerState::On, "already on"),
            "poweroff.new" => (PowerState::Off, "already off"),
            _ => return Ok(None),
        };

        let state = self.lookup.power_state(&request.target).await?;
        if state != skip_when.0 {
            return Ok(None);
        }
        info!(server = %request.target.label(), template = %request.template_id, "Server is {}, skipping.", skip_when.1);
        Ok(Some(format!("Server {} is {}", request.target.label(), skip_when.1)))
    }
}
