//! Error types for the CoinGecko tracker

use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `COINGECKO_BASE_URL` is missing or empty
    #[error("No base URL provided.")]
    MissingBaseUrl,

    /// `COINGECKO_API_KEY` is missing or empty
    #[error("No API key provided.")]
    MissingApiKey,

    /// A variable is present but cannot be used
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors that can occur when calling the CoinGecko API
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network request failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status, with the parsed error body when there was one
    #[error("CoinGeckoError: {} and Response status: {status}", display_body(.body))]
    Api {
        status: u16,
        body: Option<serde_json::Value>,
    },

    /// Body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Base URL and endpoint do not form a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Api { status, .. } => Some(*status),
            FetchError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the upstream rejected the call for rate limiting
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

fn display_body(body: &Option<serde_json::Value>) -> String {
    match body {
        Some(value) => value.to_string(),
        None => "undefined".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_embeds_status() {
        let err = FetchError::Api {
            status: 401,
            body: Some(serde_json::json!({"error": "invalid key"})),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid key"));
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_api_error_without_body() {
        let err = FetchError::Api {
            status: 429,
            body: None,
        };
        assert_eq!(
            err.to_string(),
            "CoinGeckoError: undefined and Response status: 429"
        );
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(ConfigError::MissingBaseUrl.to_string(), "No base URL provided.");
        assert_eq!(ConfigError::MissingApiKey.to_string(), "No API key provided.");
    }
}
