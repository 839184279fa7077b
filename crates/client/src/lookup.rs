//! Resolution of human identifiers to remote servers.

use async_trait::async_trait;
use fleetops_common::{OperationRequest, ResourceTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::OrchestrationError;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

impl PowerState {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ON" => PowerState::On,
            "OFF" => PowerState::Off,
            _ => PowerState::Unknown,
        }
    }
}

#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// Finds a server by name or serial number.
    async fn resolve_server(&self, identifier: &str) -> Result<ResourceTarget, OrchestrationError>;

    async fn power_state(&self, target: &ResourceTarget) -> Result<PowerState, OrchestrationError>;
}

/// [`ResourceLookup`] backed by the servers collection of the remote API.
pub struct ServerDirectory {
    transport: Arc<dyn Transport>,
    servers_endpoint: String,
}

impl ServerDirectory {
    pub fn new(transport: Arc<dyn Transport>, servers_endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            servers_endpoint: servers_endpoint.into(),
        }
    }

    fn query_uri(&self, identifier: &str) -> String {
        let escaped = identifier.replace('\'', "''");
        let filter = format!("name eq '{escaped}' or hardware/serialNumber eq '{escaped}'");
        format!("{}?filter={}", self.servers_endpoint, urlencoding::encode(&filter))
    }
}

#[async_trait]
impl ResourceLookup for ServerDirectory {
    async fn resolve_server(&self, identifier: &str) -> Result<ResourceTarget, OrchestrationError> {
        let body = self.transport.get(&self.query_uri(identifier)).await?;
        let item = body
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .ok_or_else(|| OrchestrationError::NotFound(format!("Server '{identifier}' was not found")))?;

        let field = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
        let (Some(id), Some(resource_uri)) = (field("id"), field("resourceUri")) else {
            return Err(OrchestrationError::NotFound(format!(
                "Server '{identifier}' has no id or resource URI"
            )));
        };
        debug!(identifier, server_id = %id, "Resolved server.");

        Ok(ResourceTarget {
            id,
            resource_type: field("type").unwrap_or_else(|| "compute-ops-mgmt/server".to_string()),
            resource_uri,
            name: field("name").or_else(|| Some(identifier.to_string())),
        })
    }

    async fn power_state(&self, target: &ResourceTarget) -> Result<PowerState, OrchestrationError> {
        let body = self.transport.get(&target.resource_uri).await?;
        Ok(body
            .pointer("/hardware/powerState")
            .and_then(Value::as_str)
            .map_or(PowerState::Unknown, PowerState::parse))
    }
}

/// Parses an operation request, filling its `target` from `server` (a name or
/// serial number) when one is given. A resolved server replaces any target in the body.
pub async fn resolve_request(
    lookup: &dyn ResourceLookup,
    mut body: Value,
    server: Option<&str>,
) -> Result<OperationRequest, OrchestrationError> {
    if let Some(identifier) = server {
        let target = lookup.resolve_server(identifier).await?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("target".to_string(), serde_json::to_value(&target)?);
        }
    }
    Ok(serde_json::from_value(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use reqwest::Method;
    use serde_json::json;

    const SERVERS: &str = "/compute-ops-mgmt/v1beta2/servers";

    #[tokio::test]
    async fn test_resolves_by_name_or_serial() {
        let transport = Arc::new(FakeTransport::new());
        let directory = ServerDirectory::new(transport.clone(), SERVERS);
        transport.push(
            Method::GET,
            &directory.query_uri("CZ12312312"),
            json!({ "items": [{
                "id": "P39886-B21+CZ12312312",
                "type": "compute-ops-mgmt/server",
                "resourceUri": "/compute-ops-mgmt/v1beta2/servers/P39886-B21+CZ12312312",
                "name": "ServerX"
            }]}),
        );

        let target = directory.resolve_server("CZ12312312").await.unwrap();
        assert_eq!(target.id, "P39886-B21+CZ12312312");
        assert_eq!(target.label(), "ServerX");
        assert!(transport.calls()[0].uri.contains("hardware%2FserialNumber"));
    }

    #[tokio::test]
    async fn test_request_target_resolved_from_server_name() {
        let transport = Arc::new(FakeTransport::new());
        let directory = ServerDirectory::new(transport.clone(), SERVERS);
        transport.push(
            Method::GET,
            &directory.query_uri("ServerX"),
            json!({ "items": [{
                "id": "srv-x",
                "type": "compute-ops-mgmt/server",
                "resourceUri": "/compute-ops-mgmt/v1beta2/servers/srv-x",
                "name": "ServerX"
            }]}),
        );

        let request = resolve_request(&directory, json!({ "templateId": "PowerOn.New" }), Some("ServerX"))
            .await
            .unwrap();

        assert_eq!(request.template_id, "PowerOn.New");
        assert_eq!(request.target.id, "srv-x");
        assert_eq!(request.target.resource_uri, "/compute-ops-mgmt/v1beta2/servers/srv-x");
    }

    #[tokio::test]
    async fn test_request_without_server_keeps_its_target() {
        let directory = ServerDirectory::new(Arc::new(FakeTransport::new()), SERVERS);
        let body = json!({
            "templateId": "PowerOff.New",
            "target": {
                "id": "srv-1",
                "resourceType": "compute-ops-mgmt/server",
                "resourceUri": "/compute-ops-mgmt/v1beta2/servers/srv-1"
            }
        });

        let request = resolve_request(&directory, body, None).await.unwrap();
        assert_eq!(request.target.id, "srv-1");

        let err = resolve_request(&directory, json!({ "templateId": "PowerOff.New" }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Json(_)));
    }

    #[tokio::test]
    async fn test_unknown_server_is_not_found() {
        let transport = Arc::new(FakeTransport::new());
        let directory = ServerDirectory::new(transport.clone(), SERVERS);
        transport.push(Method::GET, &directory.query_uri("ghost"), json!({ "items": [] }));

        let err = directory.resolve_server("ghost").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_power_state() {
        let transport = Arc::new(FakeTransport::new());
        let directory = ServerDirectory::new(transport.clone(), SERVERS);
        let target = ResourceTarget {
            id: "srv-1".to_string(),
            resource_type: "compute-ops-mgmt/server".to_string(),
            resource_uri: format!("{SERVERS}/srv-1"),
            name: None,
        };
        transport
            .push(Method::GET, &target.resource_uri, json!({ "hardware": { "powerState": "ON" } }))
            .push(Method::GET, &target.resource_uri, json!({ "hardware": {} }));

        assert_eq!(directory.power_state(&target).await.unwrap(), PowerState::On);
        assert_eq!(directory.power_state(&target).await.unwrap(), PowerState::Unknown);
    }
}
