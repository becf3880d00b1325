//! # jdy-gateway
//!
//! 简道云（Jiandaoyun）表单平台的 Rust 客户端：认证、重试、响应信封解析。
//!
//! Client library for the Jiandaoyun low-code form platform.
//!
//! ## Overview
//!
//! Every network call goes through one component, the [`Gateway`]. It builds
//! fresh authentication headers per attempt, retries transient failures with
//! exponential backoff, unwraps the `{code, msg, data}` envelope (or passes
//! bare JSON through), and reports failures as typed [`Error`]s.
//!
//! Record CRUD ([`records`]) and form metadata ([`forms`]) are thin layers on
//! top of the gateway.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jdy_gateway::{Gateway, Method};
//!
//! #[tokio::main]
//! async fn main() -> jdy_gateway::Result<()> {
//!     // JDY_API_KEY / JDY_APP_ID must be set
//!     let gateway = Gateway::from_env()?;
//!
//!     let path = format!("/app/{}/form", gateway.app_id());
//!     let forms = gateway.execute(Method::Get, &path, None).await?;
//!     println!("{}", forms);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Gateway, builder, request descriptor, retry loop |
//! | [`auth`] | Signed-header and bearer authentication |
//! | [`config`] | Credential and gateway configuration |
//! | [`transport`] | HTTP transport trait and reqwest implementation |
//! | [`payload`] | `{"value": x}` field wrapping |
//! | [`transaction`] | Transaction tokens for write deduplication |
//! | [`records`] | Record CRUD on one form |
//! | [`forms`] | Form list, widgets, form creation |

pub mod auth;
pub mod client;
pub mod config;
pub mod forms;
pub mod payload;
pub mod records;
pub mod transaction;
pub mod transport;

// Re-export main types for convenience
pub use auth::AuthScheme;
pub use client::{ApiRequest, Clock, Gateway, GatewayBuilder, SystemClock};
pub use config::{Credential, GatewayConfig};
pub use payload::{wrap_fields, FieldMap, FieldValue};
pub use transaction::TransactionId;
pub use transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
