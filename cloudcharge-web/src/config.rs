//! Application configuration.
//!
//! Loaded from `CLOUDCHARGE_*` environment variables, each with a default.
//! There is exactly one backend base URL; every API call goes through it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{ApiConfig, DEFAULT_BASE_URL};
use crate::feed::DEFAULT_POLL_INTERVAL;
use crate::pricing::Tariff;

/// Default address the web client listens on.
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default session file, relative to the working directory.
const DEFAULT_SESSION_FILE: &str = "cloudcharge_session.json";

/// Default static asset directory, relative to the workspace root.
const DEFAULT_STATIC_DIR: &str = "cloudcharge-web/static";

/// How long the browser waits for a position fix.
const DEFAULT_GEO_TIMEOUT_MS: u64 = 8000;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Everything the web client needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend base URL, without a trailing slash
    pub api_base_url: String,
    /// Listen address. Booking times typed into forms are read in this
    /// machine's local timezone, so the client belongs on the user's own
    /// machine (the loopback default) rather than on a shared host.
    pub bind: SocketAddr,
    pub session_file: PathBuf,
    pub static_dir: PathBuf,
    /// How often the station feed polls
    pub poll_interval: Duration,
    /// Browser geolocation timeout
    pub geolocation_timeout: Duration,
    /// Backend request timeout
    pub http_timeout: Duration,
    pub tariff: Tariff,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            poll_interval: DEFAULT_POLL_INTERVAL,
            geolocation_timeout: Duration::from_millis(DEFAULT_GEO_TIMEOUT_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            tariff: Tariff::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get("CLOUDCHARGE_API_URL") {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    var: "CLOUDCHARGE_API_URL",
                    reason: format!("expected an http(s) URL, got {url:?}"),
                });
            }
            config = config.with_api_base_url(url);
        }

        let bind = get("CLOUDCHARGE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        config.bind = bind.parse().map_err(|e| ConfigError::Invalid {
            var: "CLOUDCHARGE_BIND",
            reason: format!("{e}"),
        })?;

        if let Some(path) = get("CLOUDCHARGE_SESSION_FILE") {
            config = config.with_session_file(path);
        }
        if let Some(path) = get("CLOUDCHARGE_STATIC_DIR") {
            config.static_dir = PathBuf::from(path);
        }

        if let Some(secs) = positive("CLOUDCHARGE_POLL_SECS", get("CLOUDCHARGE_POLL_SECS"))? {
            config = config.with_poll_interval(Duration::from_secs(secs));
        }
        if let Some(ms) = positive("CLOUDCHARGE_GEO_TIMEOUT_MS", get("CLOUDCHARGE_GEO_TIMEOUT_MS"))? {
            config.geolocation_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = positive(
            "CLOUDCHARGE_HTTP_TIMEOUT_SECS",
            get("CLOUDCHARGE_HTTP_TIMEOUT_SECS"),
        )? {
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the backend base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.api_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// API client configuration derived from this config.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.api_base_url).with_timeout(self.http_timeout.as_secs().max(1))
    }
}

fn positive(var: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a positive integer, got {raw:?}"),
        }),
    }
}
