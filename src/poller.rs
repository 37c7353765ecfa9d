//! Polling price/OHLC watcher
//!
//! Re-fetches the price snapshot and the 1-day OHLC series of one coin on a
//! fixed interval, firing immediately on spawn. Results are published through
//! a `watch` channel and as `MarketEvent`s on a broadcast channel.
//!
//! # Example
//! ```no_run
//! use coingecko_tracker::{CoinGeckoClient, CoinPoller};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(CoinGeckoClient::from_env()?);
//! let poller = CoinPoller::new(client, "bitcoin");
//! let mut state = poller.subscribe();
//! state.changed().await?;
//! if let Some(price) = &state.borrow().price {
//!     println!("BTC: ${:.2}", price.usd);
//! }
//! # Ok(())
//! # }
//! ```

use crate::{
    constants::{OHLC_DAYS, POLL_INTERVAL_SECS},
    source::MarketDataSource,
    types::{ComponentHealth, HealthStatus, MarketEvent, OhlcCandle, PollStage, PriceSnapshot, Trade},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shortest accepted poll interval; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Latest data known for the watched coin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    pub price: Option<PriceSnapshot>,
    /// Most recent candle of the last non-empty OHLC response
    pub ohlc: Option<OhlcCandle>,
    /// Always empty: the REST API has no trade feed
    pub trades: Vec<Trade>,
    /// True from spawn until the poller is stopped
    pub is_connected: bool,
    /// When price or candle data last changed
    pub last_updated: Option<DateTime<Utc>>,
}

/// Periodic watcher for one coin
pub struct CoinPoller {
    coin_id: String,
    interval: Duration,
    source_name: &'static str,
    state_tx: Arc<watch::Sender<LiveState>>,
    state: watch::Receiver<LiveState>,
    events: broadcast::Sender<MarketEvent>,
    task: Option<JoinHandle<()>>,
}

impl CoinPoller {
    /// Starts polling `coin_id` every 30 seconds
    pub fn new(source: Arc<dyn MarketDataSource>, coin_id: impl Into<String>) -> Self {
        Self::spawn(source, coin_id, Duration::from_secs(POLL_INTERVAL_SECS))
    }

    /// Starts polling `coin_id` with a custom interval
    ///
    /// Intervals below one second are raised to one second.
    pub fn spawn(
        source: Arc<dyn MarketDataSource>,
        coin_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let coin_id = coin_id.into();
        let interval = if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                coin_id = %coin_id,
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short, using 1s"
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };
        let (state_tx, state) = watch::channel(LiveState {
            is_connected: true,
            ..LiveState::default()
        });
        let state_tx = Arc::new(state_tx);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let source_name = source.source_name();

        let task = tokio::spawn(poll_loop(
            source,
            coin_id.clone(),
            interval,
            state_tx.clone(),
            events.clone(),
        ));

        Self {
            coin_id,
            interval,
            source_name,
            state_tx,
            state,
            events,
            task: Some(task),
        }
    }

    pub fn coin_id(&self) -> &str {
        &self.coin_id
    }

    /// Current state snapshot
    pub fn state(&self) -> LiveState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<LiveState> {
        self.state.clone()
    }

    /// Receiver for price, candle, failure and cycle-completed events
    pub fn events(&self) -> broadcast::Receiver<MarketEvent> {
        self.events.subscribe()
    }

    /// Stops polling and marks the state disconnected
    ///
    /// Results of a cycle still in flight are discarded.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.state_tx.send_modify(|s| s.is_connected = false);
            tracing::info!(coin_id = %self.coin_id, "Stopped price poller");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Reports whether the poller holds reasonably fresh data
    pub fn health_check(&self) -> ComponentHealth {
        let state = self.state();
        let mut details = HashMap::new();

        details.insert("coin_id".to_string(), serde_json::json!(self.coin_id));
        details.insert("source".to_string(), serde_json::json!(self.source_name));
        details.insert(
            "has_price".to_string(),
            serde_json::json!(state.price.is_some()),
        );
        details.insert(
            "has_candle".to_string(),
            serde_json::json!(state.ohlc.is_some()),
        );

        let age = state
            .last_updated
            .map(|t| Utc::now().signed_duration_since(t).to_std().unwrap_or_default());
        if let Some(age) = age {
            details.insert("age_secs".to_string(), serde_json::json!(age.as_secs()));
        }

        let status = match age {
            _ if !state.is_connected => HealthStatus::Unhealthy,
            None => HealthStatus::Unhealthy,
            Some(age) if age > self.interval * 2 || state.price.is_none() => {
                HealthStatus::Degraded
            }
            Some(_) => HealthStatus::Healthy,
        };

        let message = match status {
            HealthStatus::Healthy => format!("Polling {} with fresh data", self.coin_id),
            HealthStatus::Degraded => format!("Data for {} is stale or incomplete", self.coin_id),
            HealthStatus::Unhealthy if !state.is_connected => {
                format!("Poller for {} is stopped", self.coin_id)
            }
            HealthStatus::Unhealthy => format!("No data received for {}", self.coin_id),
        };

        ComponentHealth {
            name: "coin_poller".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: Utc::now(),
        }
    }
}

impl Drop for CoinPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    source: Arc<dyn MarketDataSource>,
    coin_id: String,
    interval: Duration,
    state: Arc<watch::Sender<LiveState>>,
    events: broadcast::Sender<MarketEvent>,
) {
    tracing::info!(
        coin_id = %coin_id,
        interval_secs = interval.as_secs(),
        source = source.source_name(),
        "Starting price poller"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        poll_once(source.as_ref(), &coin_id, &state, &events).await;
    }
}

/// Runs one poll cycle; price and OHLC failures are independent
async fn poll_once(
    source: &dyn MarketDataSource,
    coin_id: &str,
    state: &watch::Sender<LiveState>,
    events: &broadcast::Sender<MarketEvent>,
) {
    let (price, candles) = futures::join!(
        source.price_snapshot(coin_id),
        source.ohlc(coin_id, OHLC_DAYS)
    );

    match price {
        Ok(Some(snapshot)) => {
            let mut old_price = None;
            let published = state.send_if_modified(|s| {
                if !s.is_connected {
                    return false;
                }
                old_price = s.price.as_ref().map(|p| p.usd);
                s.price = Some(snapshot.clone());
                s.last_updated = Some(Utc::now());
                true
            });
            if published {
                tracing::debug!(coin_id, price_usd = snapshot.usd, "Price updated");
                let _ = events.send(MarketEvent::PriceUpdated {
                    id: Uuid::new_v4(),
                    coin_id: coin_id.to_string(),
                    old_price_usd: old_price,
                    new_price_usd: snapshot.usd,
                    change_24h: snapshot.change_24h,
                    timestamp: Utc::now(),
                });
            }
        }
        Ok(None) => {
            tracing::debug!(coin_id, "Price response had no entry for coin");
        }
        Err(e) => report_failure(coin_id, PollStage::Price, &e.to_string(), state, events),
    }

    match candles {
        Ok(candles) => match candles.last().copied() {
            Some(latest) => {
                let published = state.send_if_modified(|s| {
                    if !s.is_connected {
                        return false;
                    }
                    s.ohlc = Some(latest);
                    s.last_updated = Some(Utc::now());
                    true
                });
                if published {
                    let _ = events.send(MarketEvent::CandleUpdated {
                        id: Uuid::new_v4(),
                        coin_id: coin_id.to_string(),
                        candle: latest,
                        timestamp: Utc::now(),
                    });
                }
            }
            None => tracing::debug!(coin_id, "OHLC response was empty"),
        },
        Err(e) => report_failure(coin_id, PollStage::Ohlc, &e.to_string(), state, events),
    }

    if state.borrow().is_connected {
        let _ = events.send(MarketEvent::PollCompleted {
            id: Uuid::new_v4(),
            coin_id: coin_id.to_string(),
            timestamp: Utc::now(),
        });
    }
}

fn report_failure(
    coin_id: &str,
    stage: PollStage,
    error: &str,
    state: &watch::Sender<LiveState>,
    events: &broadcast::Sender<MarketEvent>,
) {
    if !state.borrow().is_connected {
        return;
    }
    tracing::warn!(coin_id, stage = ?stage, error, "Polling error");
    let _ = events.send(MarketEvent::PollFailed {
        id: Uuid::new_v4(),
        coin_id: coin_id.to_string(),
        stage,
        error_message: error.to_string(),
        timestamp: Utc::now(),
    });
}
