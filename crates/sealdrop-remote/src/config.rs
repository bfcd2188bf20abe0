//! Transfer service configuration.

use std::time::Duration;


use crate::error::{RemoteError, Result};

/// Environment variable overriding [`RemoteConfig::api_base_url`].
pub const API_URL_ENV: &str = "SEALDROP_API_URL";

/// Environment variable overriding [`RemoteConfig::timeout`], in seconds.
pub const TIMEOUT_ENV: &str = "SEALDROP_HTTP_TIMEOUT_SECS";

/// Configuration for the HTTP transfer service client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL of the transfer API (e.g., "https://drop.example.com").
    pub api_base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RemoteConfig {
    /// Defaults, overridden by `SEALDROP_API_URL` and
    /// `SEALDROP_HTTP_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(secs) = lookup(TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| RemoteError::Config(format!("{TIMEOUT_ENV} must be whole seconds")))?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the base URL parses as http(s).
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| RemoteError::Config(format!("api_base_url: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(RemoteError::Config(format!(
                "api_base_url: unsupported scheme {other:?}"
            ))),
        }
    }

    /// Join a path onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}
