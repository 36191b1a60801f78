//! Client configuration.
//!
//! The base URL is injected configuration rather than a global. Hosts either
//! build a `ClientConfig` directly or read it from the environment.

use std::env;
use std::time::Duration;

use tracing::warn;

pub const BASE_URL_ENV: &str = "COMMENTS_API_URL";
pub const TIMEOUT_ENV: &str = "COMMENTS_API_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server origin without a trailing slash, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Upper bound on a single request, applied by `UreqTransport`.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `COMMENTS_API_URL` and `COMMENTS_API_TIMEOUT_SECS`, keeping the
    /// defaults for anything unset or unusable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(BASE_URL_ENV) {
            let base_url = normalize_base_url(&raw);
            if base_url.is_empty() {
                warn!(var = BASE_URL_ENV, "empty base url, using default");
            } else {
                config.base_url = base_url;
            }
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!(var = TIMEOUT_ENV, value = %raw, "invalid timeout, using default"),
            }
        }

        config
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
