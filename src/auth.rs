//! 认证头生成：签名头方案与 Bearer 方案。
//!
//! Authentication header construction.
//!
//! The platform has shipped two mutually exclusive schemes across API
//! versions. A gateway selects one [`AuthScheme`] at construction; headers are
//! rebuilt for every attempt because the signed scheme embeds a timestamp.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_API_KEY: &str = "X-Api-Key";
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
pub const HEADER_SIGN: &str = "X-Sign";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `X-Api-Key` + `X-Timestamp` + `X-Sign` (MD5 of key and timestamp).
    #[default]
    SignedHeader,
    /// `Authorization: Bearer <key>`.
    Bearer,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::SignedHeader => "signed_header",
            AuthScheme::Bearer => "bearer",
        }
    }

    /// Headers for one attempt. `timestamp_ms` is ignored by the bearer scheme.
    pub fn headers(&self, api_key: &str, timestamp_ms: u64) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(HEADER_CONTENT_TYPE.to_string(), "application/json".to_string());
        match self {
            AuthScheme::SignedHeader => {
                let timestamp = timestamp_ms.to_string();
                headers.insert(HEADER_SIGN.to_string(), sign(api_key, &timestamp));
                headers.insert(HEADER_API_KEY.to_string(), api_key.to_string());
                headers.insert(HEADER_TIMESTAMP.to_string(), timestamp);
            }
            AuthScheme::Bearer => {
                headers.insert(
                    HEADER_AUTHORIZATION.to_string(),
                    format!("Bearer {}", api_key),
                );
            }
        }
        headers
    }
}

impl std::str::FromStr for AuthScheme {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "signed_header" | "signed" => Ok(AuthScheme::SignedHeader),
            "bearer" => Ok(AuthScheme::Bearer),
            other => Err(crate::Error::configuration(format!(
                "unknown auth scheme '{}' (expected signed_header or bearer)",
                other
            ))),
        }
    }
}

/// Lowercase hex MD5 over `api_key ‖ timestamp`.
pub fn sign(api_key: &str, timestamp: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(api_key.as_bytes());
    hasher.update(timestamp.as_bytes());
    hex::encode(hasher.finalize())
}
