//! Types for the CoinGecko tracker
//!
//! Response shapes mirror the upstream JSON. They are read-only views of a
//! single response and carry no invariants beyond their shape.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A coin returned by `/search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub api_symbol: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub large: String,
}

/// `/search` response; exchanges, categories and NFTs are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub coins: Vec<SearchCoin>,
}

/// An entry of `/search/trending`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingCoin {
    pub item: TrendingItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub id: String,
    #[serde(default)]
    pub coin_id: Option<u64>,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub small: String,
    #[serde(default)]
    pub large: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub price_btc: Option<f64>,
    #[serde(default)]
    pub score: Option<u32>,
    pub data: TrendingData,
}

impl TrendingItem {
    /// 24h USD change in percent; absent values read as zero
    pub fn change_24h_usd(&self) -> f64 {
        self.data
            .price_change_percentage_24h
            .get("usd")
            .copied()
            .unwrap_or(0.0)
    }

    /// True when the 24h USD change is strictly positive
    pub fn is_trending_up(&self) -> bool {
        self.change_24h_usd() > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingData {
    /// USD price; upstream sends either a number or a formatted string
    #[serde(deserialize_with = "number_or_formatted")]
    pub price: f64,
    #[serde(default)]
    pub price_change_percentage_24h: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap: Option<String>,
    #[serde(default)]
    pub total_volume: Option<String>,
    #[serde(default)]
    pub sparkline: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingCoin>,
}

/// Accepts `1234.5`, `"1234.5"` or `"$1,234.50"`
fn number_or_formatted<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => {
            let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
            cleaned
                .trim()
                .parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("unparsable price: {}", s)))
        }
    }
}

/// One coin entry of a `/simple/price` response
#[derive(Debug, Clone, Deserialize)]
pub struct SimplePriceEntry {
    pub usd: f64,
    #[serde(default)]
    pub usd_market_cap: Option<f64>,
    #[serde(default)]
    pub usd_24h_vol: Option<f64>,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
    #[serde(default)]
    pub last_updated_at: Option<i64>,
}

/// `/simple/price` response keyed by coin id
pub type SimplePriceResponse = HashMap<String, SimplePriceEntry>;

/// Current price of a coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub coin_id: String,
    pub usd: f64,
    pub change_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    /// Upstream update time, or fetch time when upstream gives none
    pub timestamp: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn from_entry(coin_id: &str, entry: &SimplePriceEntry) -> Self {
        let timestamp = entry
            .last_updated_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        Self {
            coin_id: coin_id.to_string(),
            usd: entry.usd,
            change_24h: entry.usd_24h_change,
            market_cap: entry.usd_market_cap,
            volume_24h: entry.usd_24h_vol,
            timestamp,
        }
    }

    /// Age of the snapshot relative to now
    pub fn age(&self) -> std::time::Duration {
        let duration = Utc::now().signed_duration_since(self.timestamp);
        std::time::Duration::from_secs(duration.num_seconds().max(0) as u64)
    }
}

/// A price candle; decoded from `[time_ms, open, high, low, close]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct OhlcCandle {
    /// Candle close time in milliseconds since the epoch
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<[f64; 5]> for OhlcCandle {
    fn from(raw: [f64; 5]) -> Self {
        Self {
            time: raw[0] as i64,
            open: raw[1],
            high: raw[2],
            low: raw[3],
            close: raw[4],
        }
    }
}

impl From<OhlcCandle> for [f64; 5] {
    fn from(c: OhlcCandle) -> Self {
        [c.time as f64, c.open, c.high, c.low, c.close]
    }
}

impl OhlcCandle {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.time).single()
    }
}

/// Side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// An executed trade. The REST API has no trade feed, so the poller never
/// produces these; the type exists so `LiveState` has a stable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub price: f64,
    pub amount: f64,
    pub value: f64,
    pub side: TradeSide,
    pub timestamp: DateTime<Utc>,
}

/// Which half of a poll cycle an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStage {
    Price,
    Ohlc,
}

/// Events broadcast by the poller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketEvent {
    /// A new price snapshot was stored
    PriceUpdated {
        id: Uuid,
        coin_id: String,
        old_price_usd: Option<f64>,
        new_price_usd: f64,
        change_24h: Option<f64>,
        timestamp: DateTime<Utc>,
    },

    /// A new latest candle was stored
    CandleUpdated {
        id: Uuid,
        coin_id: String,
        candle: OhlcCandle,
        timestamp: DateTime<Utc>,
    },

    /// One of the poll requests failed
    PollFailed {
        id: Uuid,
        coin_id: String,
        stage: PollStage,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A poll cycle finished, whether or not anything changed
    PollCompleted {
        id: Uuid,
        coin_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    pub fn id(&self) -> Uuid {
        match self {
            MarketEvent::PriceUpdated { id, .. } => *id,
            MarketEvent::CandleUpdated { id, .. } => *id,
            MarketEvent::PollFailed { id, .. } => *id,
            MarketEvent::PollCompleted { id, .. } => *id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            MarketEvent::PriceUpdated { .. } => "PRICE_UPDATED",
            MarketEvent::CandleUpdated { .. } => "CANDLE_UPDATED",
            MarketEvent::PollFailed { .. } => "POLL_FAILED",
            MarketEvent::PollCompleted { .. } => "POLL_COMPLETED",
        }
    }
}

impl std::fmt::Display for MarketEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketEvent::PriceUpdated {
                coin_id,
                new_price_usd,
                ..
            } => write!(f, "Price updated: {} = ${:.2}", coin_id, new_price_usd),
            MarketEvent::CandleUpdated { coin_id, candle, .. } => write!(
                f,
                "Candle updated: {} O={:.2} H={:.2} L={:.2} C={:.2}",
                coin_id, candle.open, candle.high, candle.low, candle.close
            ),
            MarketEvent::PollFailed {
                coin_id,
                stage,
                error_message,
                ..
            } => write!(
                f,
                "Poll failed for {} ({:?}): {}",
                coin_id, stage, error_message
            ),
            MarketEvent::PollCompleted { coin_id, .. } => write!(f, "Poll completed: {}", coin_id),
        }
    }
}

/// Overall component health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub details: HashMap<String, serde_json::Value>,
    pub last_checked: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trending_price_number_or_string() {
        let numeric: TrendingData = serde_json::from_value(json!({
            "price": 67187.33,
            "price_change_percentage_24h": {"usd": -1.25}
        }))
        .unwrap();
        assert_eq!(numeric.price, 67187.33);

        let formatted: TrendingData =
            serde_json::from_value(json!({"price": "$1,234.50"})).unwrap();
        assert_eq!(formatted.price, 1234.5);
        assert!(formatted.price_change_percentage_24h.is_empty());
    }

    #[test]
    fn test_trending_direction() {
        let coin: TrendingCoin = serde_json::from_value(json!({
            "item": {
                "id": "pepe", "name": "Pepe", "symbol": "PEPE",
                "large": "https://img/pepe.png",
                "data": {"price": 0.00001, "price_change_percentage_24h": {"usd": -3.5}}
            }
        }))
        .unwrap();
        assert!(!coin.item.is_trending_up());
        assert_eq!(coin.item.change_24h_usd(), -3.5);
    }

    #[test]
    fn test_snapshot_from_entry() {
        let entry = SimplePriceEntry {
            usd: 100.0,
            usd_market_cap: Some(1e9),
            usd_24h_vol: None,
            usd_24h_change: Some(2.0),
            last_updated_at: Some(1_700_000_000),
        };
        let snap = PriceSnapshot::from_entry("solana", &entry);
        assert_eq!(snap.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(snap.change_24h, Some(2.0));

        let no_time = SimplePriceEntry {
            last_updated_at: None,
            ..entry
        };
        let snap = PriceSnapshot::from_entry("solana", &no_time);
        assert!(snap.age().as_secs() < 5);
    }

    #[test]
    fn test_poll_completed_event_serializes_with_tag() {
        let event = MarketEvent::PollCompleted {
            id: Uuid::new_v4(),
            coin_id: "dogecoin".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "POLL_COMPLETED");
        assert_eq!(value["coin_id"], "dogecoin");
        assert_eq!(event.event_type(), "POLL_COMPLETED");
    }

    #[test]
    fn test_candle_from_array() {
        let candles: Vec<OhlcCandle> =
            serde_json::from_value(json!([[1709395200000.0, 61942.0, 62211.0, 61721.0, 61845.0]]))
                .unwrap();
        assert_eq!(candles[0].time, 1_709_395_200_000);
        assert_eq!(candles[0].close, 61845.0);
        assert!(candles[0].timestamp().is_some());
    }
}
