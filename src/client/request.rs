use crate::transaction::TransactionId;
use crate::transport::Method;
use serde_json::Value;

/// Descriptor of one logical call: what to send, how many attempts it may use
/// and which transaction token (if any) identifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Overrides the gateway's attempt budget for this call.
    pub retries: Option<u32>,
    pub transaction_id: Option<TransactionId>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retries: None,
            transaction_id: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn retries(mut self, attempts: u32) -> Self {
        self.retries = Some(attempts);
        self
    }

    pub fn transaction_id(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    /// Mark as a deduplicated write, generating a token unless one is set.
    ///
    /// The token is fixed here, once per logical call, so all attempts share it.
    pub fn idempotent(mut self) -> Self {
        if self.transaction_id.is_none() {
            self.transaction_id = Some(TransactionId::generate());
        }
        self
    }
}
