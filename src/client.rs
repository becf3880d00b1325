//! API request gateway for the Jiandaoyun platform.
//!
//! Developer-friendly goal: keep the public surface small and predictable.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod clock;
pub mod core;
mod envelope;
mod policy;
pub mod request;

pub use builder::GatewayBuilder;
pub use clock::{Clock, SystemClock};
pub use self::core::Gateway;
pub use request::ApiRequest;
