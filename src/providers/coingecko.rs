//! CoinGecko REST client
//!
//! `fetch` is the single request helper: it builds the URL, serves fresh
//! cached bodies, attaches the API key header and turns non-success
//! statuses into `FetchError::Api`. The typed operations sit on top of it.

use crate::{
    cache::ResponseCache,
    config::CoinGeckoConfig,
    constants::{
        API_KEY_HEADER, DEFAULT_REVALIDATE_SECS, OHLC_REVALIDATE_SECS, PRICE_REVALIDATE_SECS,
        SEARCH_ENDPOINT, SIMPLE_PRICE_ENDPOINT, TRENDING_ENDPOINT, TRENDING_LIMIT,
        TRENDING_REVALIDATE_SECS, USER_AGENT, VS_CURRENCY,
    },
    error::{ConfigError, FetchError},
    metrics::{MetricsCollector, RequestMetrics},
    query::{build_url, QueryParams},
    source::MarketDataSource,
    types::{
        OhlcCandle, PriceSnapshot, SearchCoin, SearchResponse, SimplePriceResponse, TrendingCoin,
        TrendingResponse,
    },
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Instant;

/// CoinGecko API client
pub struct CoinGeckoClient {
    client: Client,
    config: CoinGeckoConfig,
    cache: ResponseCache,
    metrics: MetricsCollector,
}

impl CoinGeckoClient {
    /// Creates a new client from explicit configuration
    pub fn new(config: CoinGeckoConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let api_key =
            HeaderValue::from_str(&config.api_key).map_err(|_| ConfigError::InvalidValue {
                name: API_KEY_HEADER.to_string(),
                value: "<redacted>".to_string(),
            })?;
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            config,
            cache: ResponseCache::new(),
            metrics: MetricsCollector::new("coingecko"),
        })
    }

    /// Creates a client from `COINGECKO_BASE_URL` / `COINGECKO_API_KEY`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(CoinGeckoConfig::from_env()?)
    }

    pub fn config(&self) -> &CoinGeckoConfig {
        &self.config
    }

    /// Request metrics of this client
    pub async fn metrics(&self) -> RequestMetrics {
        self.metrics.get_metrics().await
    }

    /// Drops every cached response
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Fetches an endpoint and deserializes the JSON body into `T`
    ///
    /// # Arguments
    /// * `endpoint` - Path relative to the base URL; a leading `/` is optional
    /// * `params` - Query parameters; empty strings and nulls are dropped
    /// * `revalidate_secs` - How long the response may be served from cache;
    ///   `0` always goes to the network
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
        revalidate_secs: u64,
    ) -> Result<T, FetchError> {
        let body = self.fetch_json(endpoint, params, revalidate_secs).await?;
        serde_json::from_value(body).map_err(|e| {
            FetchError::InvalidResponse(format!(
                "Unexpected response shape from {}: {}",
                endpoint, e
            ))
        })
    }

    /// Like `fetch`, returning the untyped JSON body
    pub async fn fetch_json(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
        revalidate_secs: u64,
    ) -> Result<serde_json::Value, FetchError> {
        let url = build_url(&self.config.base_url, endpoint, params)?;

        if revalidate_secs > 0 {
            if let Some(body) = self.cache.get(url.as_str()).await {
                return Ok(body);
            }
        }

        tracing::debug!(url = %url, "Fetching from CoinGecko");
        let start = Instant::now();
        let result = self.send(url.clone()).await;
        self.metrics
            .record_request(start.elapsed(), result.is_ok())
            .await;

        let body = result?;
        self.cache
            .insert(url.as_str(), body.clone(), revalidate_secs)
            .await;
        Ok(body)
    }

    async fn send(&self, url: Url) -> Result<serde_json::Value, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.json::<serde_json::Value>().await.ok();
            tracing::warn!(status = status.as_u16(), "CoinGecko request failed");
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            FetchError::InvalidResponse(format!(
                "Failed to parse CoinGecko response: {}. Response: {}",
                e, text
            ))
        })
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn search_coins(&self, query: &str) -> Result<Vec<SearchCoin>, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let params = QueryParams::new().with("query", query);
        let response: SearchResponse = self
            .fetch(SEARCH_ENDPOINT, Some(&params), DEFAULT_REVALIDATE_SECS)
            .await?;

        tracing::debug!(query, count = response.coins.len(), "Search completed");
        Ok(response.coins)
    }

    async fn trending_coins(&self) -> Result<Vec<TrendingCoin>, FetchError> {
        let response: TrendingResponse = self
            .fetch(TRENDING_ENDPOINT, None, TRENDING_REVALIDATE_SECS)
            .await?;

        Ok(response.coins.into_iter().take(TRENDING_LIMIT).collect())
    }

    async fn price_snapshot(&self, coin_id: &str) -> Result<Option<PriceSnapshot>, FetchError> {
        let params = QueryParams::new()
            .with("ids", coin_id)
            .with("vs_currencies", VS_CURRENCY)
            .with("include_market_cap", "true")
            .with("include_24hr_vol", "true")
            .with("include_24hr_change", "true")
            .with("include_last_updated_at", "true");

        let response: SimplePriceResponse = self
            .fetch(SIMPLE_PRICE_ENDPOINT, Some(&params), PRICE_REVALIDATE_SECS)
            .await?;

        Ok(response
            .get(coin_id)
            .map(|entry| PriceSnapshot::from_entry(coin_id, entry)))
    }

    async fn ohlc(&self, coin_id: &str, days: u32) -> Result<Vec<OhlcCandle>, FetchError> {
        let params = QueryParams::new()
            .with("vs_currency", VS_CURRENCY)
            .with("days", days)
            .with("precision", "full");

        self.fetch(
            &format!("/coins/{}/ohlc", coin_id),
            Some(&params),
            OHLC_REVALIDATE_SECS,
        )
        .await
    }

    fn source_name(&self) -> &'static str {
        "coingecko"
    }
}
