//! Constants for the CoinGecko tracker
//!
//! Compile-time defaults live here. The only runtime configuration is the
//! API endpoint and key, read from the environment by `config`.

/// Environment variable holding the CoinGecko API base URL
pub const BASE_URL_ENV: &str = "COINGECKO_BASE_URL";

/// Environment variable holding the CoinGecko demo API key
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

/// Environment variable overriding the request timeout (in seconds)
pub const TIMEOUT_ENV: &str = "COINGECKO_TIMEOUT_SECS";

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coingecko-tracker/0.1.0";

/// Cache lifetime used when a caller gives no hint (in seconds)
pub const DEFAULT_REVALIDATE_SECS: u64 = 60;

/// Cache lifetime for the trending list (in seconds)
pub const TRENDING_REVALIDATE_SECS: u64 = 300;

/// Cache lifetime for simple price snapshots (in seconds)
pub const PRICE_REVALIDATE_SECS: u64 = 30;

/// Cache lifetime for OHLC series (in seconds)
pub const OHLC_REVALIDATE_SECS: u64 = 60;

/// Quiet period before a search query is sent (in milliseconds)
pub const SEARCH_DEBOUNCE_MS: u64 = 500;

/// How often the poller refreshes price and OHLC data (in seconds)
pub const POLL_INTERVAL_SECS: u64 = 30;

/// Number of trending coins shown
pub const TRENDING_LIMIT: usize = 10;

/// OHLC window requested by the poller (in days)
pub const OHLC_DAYS: u32 = 1;

/// Quote currency for all price requests
pub const VS_CURRENCY: &str = "usd";

/// CoinGecko endpoints
pub const SEARCH_ENDPOINT: &str = "/search";
pub const TRENDING_ENDPOINT: &str = "/search/trending";
pub const SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";
