use crate::auth::AuthScheme;
use crate::client::clock::Clock;
use crate::client::envelope;
use crate::client::policy::{Decision, PolicyEngine};
use crate::client::request::ApiRequest;
use crate::config::{Credential, GatewayConfig};
use crate::transaction::TRANSACTION_ID_KEY;
use crate::transport::{HttpRequest, Method, Transport};
use crate::{Error, ErrorContext, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Authenticated, retrying entry point for every call to the platform.
///
/// Holds only immutable state; clone it or share it behind an `Arc` across
/// tasks.
#[derive(Clone)]
pub struct Gateway {
    pub(crate) credential: Credential,
    pub(crate) config: Arc<GatewayConfig>,
    pub(crate) base_url: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("auth_scheme", &self.config.auth_scheme)
            .field("retries", &self.config.retries)
            .finish()
    }
}

impl Gateway {
    /// Gateway from `JDY_*` environment variables with the reqwest transport.
    pub fn from_env() -> Result<Self> {
        crate::client::builder::GatewayBuilder::from_env()?.build()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn app_id(&self) -> &str {
        self.credential.app_id()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn auth_scheme(&self) -> AuthScheme {
        self.config.auth_scheme
    }

    /// Issue one logical call and return the unwrapped payload.
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        self.execute_request(request).await
    }

    /// Like [`Gateway::execute`] but decodes the payload into `T`.
    pub async fn execute_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let payload = self.execute_request(request).await?;
        decode(payload)
    }

    /// Issue a fully described call: validation, token threading, then the
    /// attempt loop.
    pub async fn execute_request(&self, request: ApiRequest) -> Result<Value> {
        let ApiRequest {
            method,
            path,
            body,
            retries,
            transaction_id,
        } = request;

        let path = normalize_path(&path)?;
        let mut context = ErrorContext::new()
            .with_method(method.as_str())
            .with_path(path.clone());

        if method == Method::Get && body.is_some() {
            return Err(Error::invalid_request("GET requests cannot carry a body")
                .with_context(context));
        }
        if retries == Some(0) {
            return Err(Error::invalid_request("retry budget must be at least 1")
                .with_context(context));
        }

        // The token goes into the body once; every attempt reuses this body.
        let body = match &transaction_id {
            Some(id) => {
                context = context.with_transaction_id(id.as_str());
                let mut obj = match body {
                    Some(Value::Object(obj)) => obj,
                    None => Map::new(),
                    Some(_) => {
                        return Err(Error::invalid_request(
                            "a transaction id needs a JSON object body",
                        )
                        .with_context(context))
                    }
                };
                obj.insert(
                    TRANSACTION_ID_KEY.to_string(),
                    Value::String(id.as_str().to_string()),
                );
                Some(Value::Object(obj))
            }
            None => body,
        };

        let policy = PolicyEngine::new(
            retries.unwrap_or(self.config.retries),
            self.config.backoff_base(),
            self.config.retry_on_permission_denied,
        );
        let url = format!("{}{}", self.base_url, path);

        let mut attempt: u32 = 1;
        let mut last_timestamp: Option<u64> = None;
        loop {
            let attempt_ctx = context.clone().with_attempt(attempt);
            let timestamp = next_timestamp(self.clock.now_millis(), last_timestamp);
            last_timestamp = Some(timestamp);
            let result = self
                .attempt_once(method, &path, &url, body.as_ref(), attempt, timestamp)
                .await
                .map_err(|e| e.with_context(attempt_ctx));

            let err = match result {
                Ok(payload) => return Ok(payload),
                Err(e) => e,
            };

            match policy.decide(&err, attempt) {
                Decision::Retry { delay } => {
                    warn!(
                        method = method.as_str(),
                        path = path.as_str(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        error_kind = err.kind().as_str(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "jdy request failed, retrying"
                    );
                    if delay > Duration::ZERO {
                        self.clock.sleep(delay).await;
                    }
                    attempt = attempt.saturating_add(1);
                }
                Decision::Fail => {
                    warn!(
                        method = method.as_str(),
                        path = path.as_str(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        error_kind = err.kind().as_str(),
                        error = %err,
                        "jdy request failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// A single attempt: fresh headers, one round-trip, classification.
    async fn attempt_once(
        &self,
        method: Method,
        path: &str,
        url: &str,
        body: Option<&Value>,
        attempt: u32,
        timestamp_ms: u64,
    ) -> Result<Value> {
        let headers = self
            .config
            .auth_scheme
            .headers(self.credential.api_key(), timestamp_ms);

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body: body.cloned(),
            timeout: self.config.timeout(),
        };

        let start = Instant::now();
        let response = self.transport.send(request).await?;

        info!(
            method = method.as_str(),
            path,
            attempt,
            http_status = response.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "jdy request completed"
        );

        envelope::classify(&response)
    }
}

/// Signature timestamps strictly increase across the attempts of one call,
/// even when the clock has not moved.
fn next_timestamp(now_ms: u64, last: Option<u64>) -> u64 {
    match last {
        Some(prev) if now_ms <= prev => prev.saturating_add(1),
        _ => now_ms,
    }
}

/// Reject empty paths and make sure the path starts with `/`.
fn normalize_path(path: &str) -> Result<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_request("endpoint path must not be empty"));
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{}", trimmed))
    }
}

/// Decode a payload into a typed value; shape mismatches are format errors.
pub(crate) fn decode<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde::Deserialize::deserialize(&payload).map_err(|e: serde_json::Error| {
        Error::response_format(
            format!("unexpected payload shape: {}", e),
            &payload.to_string(),
        )
    })
}
