//! Transaction tokens for write deduplication on the platform side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body key the platform reads the token from.
pub const TRANSACTION_ID_KEY: &str = "transaction_id";

/// Opaque per-logical-operation token. Every attempt of one retried write
/// carries the same token so the platform can collapse duplicate deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Fresh random token (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
