//! Scripted transport shared by the unit tests.

use crate::client::{ApiRequest, ApiResponse, ArcherClient, HttpTransport};
use crate::session::Session;
use archer_link_core::ArcherError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    responses: VecDeque<ApiResponse>,
    requests: Vec<ApiRequest>,
}

/// Replays queued responses in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> ArcherClient {
        ArcherClient::new(Arc::new(self.clone()))
    }

    pub fn respond(&self, status: u16, body: Value) {
        self.respond_text(status, &body.to_string());
    }

    pub fn respond_text(&self, status: u16, body: &str) {
        self.lock().responses.push_back(ApiResponse {
            status,
            body: body.to_string(),
        });
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.lock().requests.iter().map(|r| r.url.clone()).collect()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Requests whose URL ends with `path`.
    pub fn count_matching(&self, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script lock")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ArcherError> {
        let mut script = self.lock();
        let url = request.url.clone();
        script.requests.push(request);
        script
            .responses
            .pop_front()
            .ok_or_else(|| ArcherError::api(0, format!("no scripted response for {url}")))
    }
}

/// Successful envelope around `object`.
pub fn envelope(object: Value) -> Value {
    json!({"RequestedObject": object, "IsSuccessful": true, "ValidationMessages": []})
}

pub fn external_session(base_url: &str) -> Session {
    Session::external("test-token", base_url, None)
}
