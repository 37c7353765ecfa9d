//! # CoinGecko Tracker SDK
//!
//! A small client for the CoinGecko market data API with the pieces a
//! price-tracking front end needs:
//!
//! - `CoinGeckoClient::fetch`: request helper with query encoding, API-key
//!   headers and timed cache revalidation
//! - `SearchSession`: debounced coin search
//! - `trending_rows`: the trending-coins table
//! - `CoinPoller`: price and OHLC polling for one coin
//!
//! ## Usage
//!
//! ```no_run
//! use coingecko_tracker::{CoinGeckoClient, MarketDataSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads COINGECKO_BASE_URL and COINGECKO_API_KEY (a .env file works too)
//! let client = CoinGeckoClient::from_env()?;
//!
//! if let Some(price) = client.price_snapshot("solana").await? {
//!     println!("SOL: ${:.2}", price.usd);
//! }
//!
//! for coin in client.search_coins("bitcoin").await? {
//!     println!("{} ({})", coin.name, coin.symbol);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use coingecko_tracker::{CoinGeckoClient, FetchError};
//!
//! # async fn example(client: CoinGeckoClient) {
//! match client.fetch::<serde_json::Value>("/ping", None, 0).await {
//!     Ok(body) => println!("{}", body),
//!     Err(e) if e.is_rate_limited() => eprintln!("Slow down"),
//!     Err(FetchError::Api { status, .. }) => eprintln!("HTTP {}", status),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod providers;
pub mod query;
pub mod search;
pub mod source;
pub mod trending;
pub mod types;

// Re-export commonly used types
pub use config::CoinGeckoConfig;
pub use error::{ConfigError, FetchError};
pub use metrics::RequestMetrics;
pub use poller::{CoinPoller, LiveState};
pub use providers::CoinGeckoClient;
pub use query::{build_url, QueryParams, QueryValue};
pub use search::{SearchSession, SearchState};
pub use source::MarketDataSource;
pub use trending::{trending_rows, TrendingRow};
pub use types::{
    ComponentHealth, HealthStatus, MarketEvent, OhlcCandle, PollStage, PriceSnapshot, SearchCoin,
    Trade, TrendingCoin,
};
