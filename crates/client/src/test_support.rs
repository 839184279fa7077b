//! Scripted collaborators for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::clock::Clock;
use crate::transport::{Transport, TransportError};

pub(crate) const JOB_URI: &str = "/compute-ops-mgmt/v1beta3/jobs/3f1c9a52";

#[derive(Clone)]
enum Scripted {
    Body(Value),
    Status(u16, String),
}

impl Scripted {
    fn into_result(self) -> Result<Value, TransportError> {
        match self {
            Scripted::Body(value) => Ok(value),
            Scripted::Status(status, message) => Err(TransportError::from_status(status, message)),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub uri: String,
    pub body: Option<Value>,
}

/// Transport that replays queued responses per (method, uri) and records every call.
/// Once a queue is drained the fallback for that route (if any) is returned.
#[derive(Default)]
pub(crate) struct FakeTransport {
    queued: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    fallback: Mutex<HashMap<(Method, String), Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, method: Method, uri: &str, body: Value) -> &Self {
        self.queue(method, uri, Scripted::Body(body))
    }

    pub fn push_error(&self, method: Method, uri: &str, status: u16, message: &str) -> &Self {
        self.queue(method, uri, Scripted::Status(status, message.to_string()))
    }

    pub fn always(&self, method: Method, uri: &str, body: Value) -> &Self {
        self.fallback
            .lock()
            .unwrap()
            .insert((method, uri.to_string()), Scripted::Body(body));
        self
    }

    fn queue(&self, method: Method, uri: &str, scripted: Scripted) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .entry((method, uri.to_string()))
            .or_default()
            .push_back(scripted);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, uri: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.uri == uri)
            .count()
    }

    pub fn count_method(&self, method: Method) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, method: Method, uri: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.clone(),
            uri: uri.to_string(),
            body: body.cloned(),
        });

        let key = (method, uri.to_string());
        let next = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        let scripted = next.or_else(|| self.fallback.lock().unwrap().get(&key).cloned());

        match scripted {
            Some(scripted) => scripted.into_result(),
            None => Err(TransportError::from_status(
                500,
                format!("no scripted response for {} {}", key.0, key.1),
            )),
        }
    }
}

/// Clock whose `sleep` advances virtual time instantly.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }
}

pub(crate) fn job_json(uri: &str, state: &str, result_code: Option<&str>) -> Value {
    json!({
        "id": uri.rsplit('/').next().unwrap_or_default(),
        "type": "compute-ops-mgmt/job",
        "resourceUri": uri,
        "state": state,
        "resultCode": result_code,
        "createdAt": "2026-10-18T12:00:00Z",
        "updatedAt": "2026-10-18T12:01:40Z",
        "associatedResourceId": "srv-0042"
    })
}
