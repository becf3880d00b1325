use crate::auth::AuthScheme;
use crate::client::clock::{Clock, SystemClock};
use crate::client::core::Gateway;
use crate::config::{Credential, GatewayConfig};
use crate::transport::{ReqwestTransport, Transport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for [`Gateway`].
///
/// Keep this surface area small and predictable: a credential, a config, and
/// optional overrides for the transport and clock (mostly for tests).
pub struct GatewayBuilder {
    credential: Credential,
    config: GatewayConfig,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl GatewayBuilder {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            config: GatewayConfig::default(),
            transport: None,
            clock: None,
        }
    }

    /// Credential and config from the `JDY_*` environment variables.
    ///
    /// A missing credential fails here, before any network call.
    pub fn from_env() -> Result<Self> {
        let credential = Credential::from_env()?;
        let config = GatewayConfig::from_env()?;
        debug!(
            app_id = credential.app_id(),
            auth_scheme = config.auth_scheme.as_str(),
            entries = config.entries.len(),
            "gateway configuration loaded from environment"
        );
        Ok(Self::new(credential).config(config))
    }

    /// Replace the whole config.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.config.auth_scheme = scheme;
        self
    }

    /// Attempts per call, including the first one.
    pub fn retries(mut self, attempts: u32) -> Self {
        self.config.retries = attempts;
        self
    }

    /// Per-attempt timeout, rounded up to whole seconds (at least 1s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_millis() as u64;
        self.config.timeout_secs = millis.div_ceil(1000).max(1);
        self
    }

    /// Base unit of the exponential backoff (`base * 2^(k-1)`).
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.config.backoff_base_ms = base.as_millis() as u64;
        self
    }

    pub fn retry_on_permission_denied(mut self, enable: bool) -> Self {
        self.config.retry_on_permission_denied = enable;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the config and build the gateway.
    pub fn build(self) -> Result<Gateway> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let base_url = self.config.base_url.trim_end_matches('/').to_string();

        Ok(Gateway {
            credential: self.credential,
            config: Arc::new(self.config),
            base_url,
            transport,
            clock,
        })
    }
}
