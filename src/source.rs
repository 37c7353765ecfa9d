//! Data source abstraction consumed by search, trending and the poller

use crate::{
    error::FetchError,
    types::{OhlcCandle, PriceSnapshot, SearchCoin, TrendingCoin},
};
use async_trait::async_trait;

/// Trait for market data sources
///
/// `CoinGeckoClient` is the production implementation. The leaf components
/// only depend on this trait so they can be driven by a scripted source.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Searches coins by name or symbol
    async fn search_coins(&self, query: &str) -> Result<Vec<SearchCoin>, FetchError>;

    /// Returns the currently trending coins, most popular first
    async fn trending_coins(&self) -> Result<Vec<TrendingCoin>, FetchError>;

    /// Fetches the USD price snapshot for a coin
    ///
    /// `Ok(None)` means the request succeeded but the coin was not in the
    /// response.
    async fn price_snapshot(&self, coin_id: &str) -> Result<Option<PriceSnapshot>, FetchError>;

    /// Fetches USD OHLC candles covering the last `days` days, oldest first
    async fn ohlc(&self, coin_id: &str, days: u32) -> Result<Vec<OhlcCandle>, FetchError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted data source for tests
    ///
    /// Failures are stored as HTTP status codes and turned into
    /// `FetchError::Api` on every call, since `FetchError` is not `Clone`.
    #[derive(Default)]
    pub struct MockSource {
        search: Mutex<HashMap<String, Result<Vec<SearchCoin>, u16>>>,
        trending: Mutex<Option<Result<Vec<TrendingCoin>, u16>>>,
        price: Mutex<Option<Result<Option<PriceSnapshot>, u16>>>,
        ohlc: Mutex<Option<Result<Vec<OhlcCandle>, u16>>>,
        delay: Mutex<Option<Duration>>,
        search_calls: Mutex<Vec<String>>,
        price_calls: Mutex<usize>,
        ohlc_calls: Mutex<usize>,
    }

    fn api_error(status: u16) -> FetchError {
        FetchError::Api { status, body: None }
    }

    impl MockSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every call sleep first, to observe in-flight behavior
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        pub fn set_search(&self, query: &str, coins: Vec<SearchCoin>) {
            self.search
                .lock()
                .unwrap()
                .insert(query.to_string(), Ok(coins));
        }

        pub fn fail_search(&self, query: &str, status: u16) {
            self.search
                .lock()
                .unwrap()
                .insert(query.to_string(), Err(status));
        }

        pub fn set_trending(&self, coins: Vec<TrendingCoin>) {
            *self.trending.lock().unwrap() = Some(Ok(coins));
        }

        pub fn set_price(&self, snapshot: Option<PriceSnapshot>) {
            *self.price.lock().unwrap() = Some(Ok(snapshot));
        }

        pub fn fail_price(&self, status: u16) {
            *self.price.lock().unwrap() = Some(Err(status));
        }

        pub fn set_ohlc(&self, candles: Vec<OhlcCandle>) {
            *self.ohlc.lock().unwrap() = Some(Ok(candles));
        }

        pub fn fail_ohlc(&self, status: u16) {
            *self.ohlc.lock().unwrap() = Some(Err(status));
        }

        pub fn search_calls(&self) -> Vec<String> {
            self.search_calls.lock().unwrap().clone()
        }

        pub fn price_calls(&self) -> usize {
            *self.price_calls.lock().unwrap()
        }

        pub fn ohlc_calls(&self) -> usize {
            *self.ohlc_calls.lock().unwrap()
        }

        async fn maybe_sleep(&self) {
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for MockSource {
        async fn search_coins(&self, query: &str) -> Result<Vec<SearchCoin>, FetchError> {
            self.search_calls.lock().unwrap().push(query.to_string());
            self.maybe_sleep().await;
            let scripted = self.search.lock().unwrap().get(query).cloned();
            match scripted {
                Some(Ok(coins)) => Ok(coins),
                Some(Err(status)) => Err(api_error(status)),
                None => Ok(Vec::new()),
            }
        }

        async fn trending_coins(&self) -> Result<Vec<TrendingCoin>, FetchError> {
            self.maybe_sleep().await;
            let scripted = self.trending.lock().unwrap().clone();
            match scripted {
                Some(Ok(coins)) => Ok(coins),
                Some(Err(status)) => Err(api_error(status)),
                None => Ok(Vec::new()),
            }
        }

        async fn price_snapshot(
            &self,
            _coin_id: &str,
        ) -> Result<Option<PriceSnapshot>, FetchError> {
            *self.price_calls.lock().unwrap() += 1;
            self.maybe_sleep().await;
            let scripted = self.price.lock().unwrap().clone();
            match scripted {
                Some(Ok(snapshot)) => Ok(snapshot),
                Some(Err(status)) => Err(api_error(status)),
                None => Ok(None),
            }
        }

        async fn ohlc(&self, _coin_id: &str, _days: u32) -> Result<Vec<OhlcCandle>, FetchError> {
            *self.ohlc_calls.lock().unwrap() += 1;
            self.maybe_sleep().await;
            let scripted = self.ohlc.lock().unwrap().clone();
            match scripted {
                Some(Ok(candles)) => Ok(candles),
                Some(Err(status)) => Err(api_error(status)),
                None => Ok(Vec::new()),
            }
        }

        fn source_name(&self) -> &'static str {
            "mock"
        }
    }
}
