//! 配置加载：凭证、网关参数与表单 ID 映射。
//!
//! Configuration: credential, gateway knobs and named entry (form) ids.
//!
//! Precedence, lowest to highest: built-in defaults, YAML file, environment.
//! Environment access goes through a lookup closure so tests never have to
//! mutate the process environment.

use crate::auth::AuthScheme;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.jiandaoyun.com/api/v5";
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

pub const ENV_API_KEY: &str = "JDY_API_KEY";
pub const ENV_APP_ID: &str = "JDY_APP_ID";
const ENTRY_ID_PREFIX: &str = "JDY_";
const ENTRY_ID_SUFFIX: &str = "_ENTRY_ID";

/// API key plus application id. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    api_key: String,
    app_id: String,
}

impl Credential {
    pub fn new(api_key: impl Into<String>, app_id: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        let app_id = app_id.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::configuration(format!(
                "{} is missing or empty",
                ENV_API_KEY
            )));
        }
        if app_id.is_empty() {
            return Err(Error::configuration(format!(
                "{} is missing or empty",
                ENV_APP_ID
            )));
        }
        Ok(Self { api_key, app_id })
    }

    /// Read `JDY_API_KEY` / `JDY_APP_ID` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY).unwrap_or_default();
        let app_id = lookup(ENV_APP_ID).unwrap_or_default();
        Self::new(api_key, app_id)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// First eight characters of the key, for diagnostics output.
    pub fn masked_key(&self) -> String {
        let prefix: String = self.api_key.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.masked_key())
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// Gateway settings. Everything except the credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub auth_scheme: AuthScheme,
    /// Attempts per logical call, including the first one.
    pub retries: u32,
    pub timeout_secs: u64,
    pub backoff_base_ms: u64,
    /// HTTP 403 is retried like any other failure unless this is turned off.
    pub retry_on_permission_denied: bool,
    pub proxy_url: Option<String>,
    /// Entry ids by lowercase name, e.g. `volunteer -> 64f0...`.
    pub entries: BTreeMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_scheme: AuthScheme::default(),
            retries: DEFAULT_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            retry_on_permission_denied: true,
            proxy_url: None,
            entries: BTreeMap::new(),
        }
    }
}

impl GatewayConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::configuration(format!("invalid gateway config: {}", e)))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded gateway config file");
        Self::from_yaml_str(&raw)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let vars: Vec<(String, String)> = std::env::vars().collect();
        let mut config = Self::default();
        config.apply_env(|k| std::env::var(k).ok(), &vars)?;
        Ok(config)
    }

    /// Overlay environment values. `vars` is scanned for `JDY_<NAME>_ENTRY_ID`.
    pub fn apply_env<F>(&mut self, lookup: F, vars: &[(String, String)]) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("JDY_BASE_URL") {
            self.base_url = url;
        }
        if let Some(scheme) = lookup("JDY_AUTH_SCHEME") {
            self.auth_scheme = scheme.parse()?;
        }
        if let Some(raw) = lookup("JDY_RETRIES") {
            self.retries = parse_env("JDY_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("JDY_TIMEOUT_SECS") {
            self.timeout_secs = parse_env("JDY_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("JDY_BACKOFF_BASE_MS") {
            self.backoff_base_ms = parse_env("JDY_BACKOFF_BASE_MS", &raw)?;
        }
        if let Some(raw) = lookup("JDY_RETRY_ON_403") {
            self.retry_on_permission_denied = parse_env("JDY_RETRY_ON_403", &raw)?;
        }
        if let Some(proxy) = lookup("JDY_PROXY_URL").filter(|p| !p.trim().is_empty()) {
            self.proxy_url = Some(proxy);
        }

        for (key, value) in vars {
            if let Some(name) = key
                .strip_prefix(ENTRY_ID_PREFIX)
                .and_then(|rest| rest.strip_suffix(ENTRY_ID_SUFFIX))
            {
                if !name.is_empty() && !value.trim().is_empty() {
                    debug!(entry = %name.to_lowercase(), "entry id from environment");
                    self.entries
                        .insert(name.to_lowercase(), value.trim().to_string());
                }
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration(format!("invalid base_url '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "base_url must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.retries == 0 {
            return Err(Error::configuration("retries must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::configuration("timeout_secs must be positive"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Look up a named entry id (case-insensitive).
    pub fn entry_id(&self, name: &str) -> Result<&str> {
        self.entries
            .get(&name.to_lowercase())
            .map(String::as_str)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "no entry id configured for '{}' (set JDY_{}_ENTRY_ID)",
                    name,
                    name.to_uppercase()
                ))
            })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::configuration(format!("{}='{}': {}", key, raw, e)))
}
