//! Narrow interface to the authenticated, region-scoped REST API.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

pub mod http;

pub use http::HttpTransport;

/// Message fragments the remote service uses to say a collection job must run first.
const COLLECTION_MISSING_FRAGMENTS: &[&str] = &[
    "run external storage details job",
    "collection job must be run",
];

/// Classification assigned once, where the HTTP status and body are first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    NotFound,
    CollectionMissing,
    Other,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        kind: TransportErrorKind,
    },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

impl TransportError {
    pub fn from_status(status: u16, message: String) -> Self {
        let kind = classify(status, &message);
        TransportError::Status { status, message, kind }
    }

    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Status { kind, .. } => *kind,
            _ => TransportErrorKind::Other,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn classify(status: u16, message: &str) -> TransportErrorKind {
    if status != 404 {
        return TransportErrorKind::Other;
    }
    let lowered = message.to_lowercase();
    if COLLECTION_MISSING_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
    {
        TransportErrorKind::CollectionMissing
    } else {
        TransportErrorKind::NotFound
    }
}

/// Performs one authenticated call and returns the parsed JSON body.
///
/// Implementations own authentication and region selection; the engine never
/// mutates them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, method: Method, uri: &str, body: Option<&Value>) -> Result<Value, TransportError>;

    async fn get(&self, uri: &str) -> Result<Value, TransportError> {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: &Value) -> Result<Value, TransportError> {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn patch(&self, uri: &str, body: &Value) -> Result<Value, TransportError> {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> Result<Value, TransportError> {
        self.send(Method::DELETE, uri, None).await
    }
}
