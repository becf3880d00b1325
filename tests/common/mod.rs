//! Scripted transport and recording clock shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use jdy_gateway::{
    Clock, Credential, Gateway, GatewayBuilder, HttpRequest, HttpResponse, Transport,
    TransportError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_KEY: &str = "test-api-key-0001";
pub const APP_ID: &str = "app-1";
pub const BASE_URL: &str = "https://jdy.test/api/v5";

/// What the scripted transport does for one attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(u16, String),
    Timeout,
    ConnectionRefused,
}

impl Step {
    pub fn ok(body: &str) -> Self {
        Step::Respond(200, body.to_string())
    }

    pub fn status(status: u16, body: &str) -> Self {
        Step::Respond(status, body.to_string())
    }
}

/// Plays back queued steps; the last step repeats once the queue runs dry.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new(vec![step])
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let timeout = request.timeout;
        self.requests.lock().unwrap().push(request);

        let step = {
            let mut steps = self.steps.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match steps.pop_front() {
                Some(step) => {
                    *last = Some(step.clone());
                    step
                }
                None => last.clone().expect("scripted transport has no steps"),
            }
        };

        match step {
            Step::Respond(status, body) => Ok(HttpResponse::new(status, body)),
            Step::Timeout => Err(TransportError::Timeout(timeout)),
            Step::ConnectionRefused => Err(TransportError::Other("connection refused".into())),
        }
    }
}

/// Starts at a fixed epoch-ms; every sleep is recorded and advances the clock.
pub struct RecordingClock {
    now_ms: AtomicU64,
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicU64::new(1_700_000_000_000),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now_millis(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.now_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

pub fn credential() -> Credential {
    Credential::new(API_KEY, APP_ID).unwrap()
}

/// Builder wired to the scripted transport and recording clock, 1s backoff base.
pub fn builder(transport: Arc<ScriptedTransport>, clock: Arc<RecordingClock>) -> GatewayBuilder {
    GatewayBuilder::new(credential())
        .base_url(BASE_URL)
        .backoff_base(Duration::from_secs(1))
        .transport(transport)
        .clock(clock)
}

pub fn gateway(transport: Arc<ScriptedTransport>, clock: Arc<RecordingClock>) -> Gateway {
    builder(transport, clock).build().unwrap()
}
