use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{Transport, TransportError};
use crate::config::ClientConfig;
use crate::version::VERSION;

/// `reqwest` implementation of [`Transport`] bound to one regional base URL.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_token: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(format!("fleetops/{VERSION}"))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn resolve_url(&self, uri: &str) -> Result<String, TransportError> {
        if uri.starts_with("https://") || uri.starts_with("http://") {
            return Ok(uri.to_string());
        }
        if !uri.starts_with('/') {
            return Err(TransportError::InvalidUri(uri.to_string()));
        }
        Ok(format!("{}{}", self.base_url, uri))
    }
}

/// Pulls the human-readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "errorMessage", "detail"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, body))]
    async fn send(&self, method: Method, uri: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        let url = self.resolve_url(uri)?;
        let content_type = if method == Method::PATCH {
            "application/merge-patch+json"
        } else {
            "application/json"
        };

        let mut request_builder = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_token)
            .header(header::ACCEPT, "application/json");

        if let Some(body) = body {
            request_builder = request_builder
                .header(header::CONTENT_TYPE, content_type)
                .body(serde_json::to_vec(body)?);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "Received response.");

        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16(), error_message(&text)));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
