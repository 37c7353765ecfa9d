//! Runtime configuration for the CoinGecko client
//!
//! The base URL and API key are required and read from the environment
//! (a `.env` file is honored). Missing values fail fast.

use crate::{
    constants::{API_KEY_ENV, BASE_URL_ENV, REQUEST_TIMEOUT_SECS, TIMEOUT_ENV},
    error::ConfigError,
};
use std::time::Duration;

/// Connection settings for the CoinGecko API
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// API base URL, e.g. `https://api.coingecko.com/api/v3`
    pub base_url: String,
    /// Demo API key sent in the `x-cg-demo-api-key` header
    pub api_key: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl CoinGeckoConfig {
    /// Creates a config with the default timeout
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Overrides the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Loads the config from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = non_empty(lookup(BASE_URL_ENV)).ok_or(ConfigError::MissingBaseUrl)?;
        let api_key = non_empty(lookup(API_KEY_ENV)).ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(base_url, api_key);

        if let Some(raw) = non_empty(lookup(TIMEOUT_ENV)) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: TIMEOUT_ENV.to_string(),
                    value: raw.clone(),
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        tracing::debug!(
            base_url = %config.base_url,
            timeout_secs = config.request_timeout.as_secs(),
            "Loaded CoinGecko configuration"
        );

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
