//! Scripted backend used by the pipeline integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{BridgeError, HttpClient, HttpRequest, HttpResponse};
use core_pipeline::{Backend, PipelineController, PipelinePhase, PipelineState, PollPolicy};
use core_runtime::events::EventBus;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use url::Url;

pub const BASE_URL: &str = "http://backend.test";

#[derive(Clone)]
pub enum Scripted {
    Respond(u16, String),
    Fail(String),
    /// Respond only after the gate is notified.
    Gated(Arc<Notify>, u16, String),
}

impl Scripted {
    pub fn json(value: Value) -> Self {
        Scripted::Respond(200, value.to_string())
    }

    pub fn status(status: &str) -> Self {
        Self::json(serde_json::json!({"status": "ok", "data": {"status": status}}))
    }

    pub fn completed(file_name: &str) -> Self {
        Self::json(serde_json::json!({
            "status": "ok",
            "data": {"status": "completed", "filename": file_name}
        }))
    }
}

/// Fake `HttpClient` answering from per-route queues.
///
/// Routes are keyed as `"METHOD /path"`. The last scripted response of a
/// route is repeated forever; unknown routes answer 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, method: &str, path: &str, responses: Vec<Scripted>) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), responses.into());
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| Url::parse(&r.url).unwrap().path().to_string())
            .collect()
    }

    pub fn count(&self, path_prefix: &str) -> usize {
        self.request_paths()
            .iter()
            .filter(|p| p.starts_with(path_prefix))
            .count()
    }

    /// Wait until at least `n` requests were received.
    pub async fn wait_for_requests(&self, n: usize) {
        for _ in 0..500 {
            if self.requests.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("expected {} requests, got {:?}", n, self.request_paths());
    }

    fn next_response(&self, key: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        let path = Url::parse(&request.url).unwrap().path().to_string();
        let key = format!("{} {}", request.method.as_str(), path);
        self.requests.lock().unwrap().push(request);

        match self.next_response(&key) {
            Some(Scripted::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Scripted::Fail(message)) => Err(BridgeError::OperationFailed(message)),
            Some(Scripted::Gated(gate, status, body)) => {
                gate.notified().await;
                Ok(HttpResponse::new(status, body))
            }
            None => Ok(HttpResponse::new(404, "not found")),
        }
    }
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy::default()
        .with_interval(Duration::from_millis(1))
        .with_max_attempts(50)
}

pub fn controller(client: Arc<ScriptedHttpClient>, policy: PollPolicy) -> PipelineController {
    controller_with_bus(client, policy, EventBus::new(256))
}

pub fn controller_with_bus(
    client: Arc<ScriptedHttpClient>,
    policy: PollPolicy,
    event_bus: EventBus,
) -> PipelineController {
    let backend = Backend::new(client, Url::parse(BASE_URL).unwrap());
    PipelineController::new(backend, policy, event_bus)
}

/// Drain every state currently buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<PipelineState>) -> Vec<PipelineState> {
    let mut states = Vec::new();
    while let Ok(state) = rx.try_recv() {
        states.push(state);
    }
    states
}

/// Phases in publish order with consecutive repeats collapsed.
pub fn phase_sequence(states: &[PipelineState]) -> Vec<PipelinePhase> {
    let mut phases: Vec<PipelinePhase> = Vec::new();
    for state in states {
        if phases.last() != Some(&state.phase) {
            phases.push(state.phase);
        }
    }
    phases
}

/// Script the happy path for job 42.
pub fn script_happy_path(client: &ScriptedHttpClient) {
    client.route(
        "POST",
        "/download",
        vec![Scripted::json(serde_json::json!({"status": "ok", "jobId": 42}))],
    );
    client.route(
        "GET",
        "/status/42",
        vec![
            Scripted::status("queued"),
            Scripted::status("processing"),
            Scripted::completed("42.mp4"),
        ],
    );
    client.route(
        "GET",
        "/downloadFile/42/42.mp4",
        vec![Scripted::json(serde_json::json!({
            "status": "ok",
            "url": "https://cdn.example.com/42.mp4",
            "size": 1048576
        }))],
    );
}
