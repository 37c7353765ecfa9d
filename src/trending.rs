//! Trending coins table

use crate::{
    constants::TRENDING_LIMIT, error::FetchError, source::MarketDataSource, types::TrendingCoin,
};
use serde::Serialize;

/// One row of the trending table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingRow {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Magnitude of the 24h USD change in percent
    pub change_24h_pct: f64,
    pub is_up: bool,
    pub price: f64,
}

impl From<&TrendingCoin> for TrendingRow {
    fn from(coin: &TrendingCoin) -> Self {
        let item = &coin.item;
        let change = item.change_24h_usd();
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            image: item.large.clone(),
            change_24h_pct: change.abs(),
            is_up: item.is_trending_up(),
            price: item.data.price,
        }
    }
}

/// Fetches trending coins and maps them to table rows
pub async fn trending_rows(source: &dyn MarketDataSource) -> Result<Vec<TrendingRow>, FetchError> {
    let coins = source.trending_coins().await?;
    Ok(coins
        .iter()
        .take(TRENDING_LIMIT)
        .map(TrendingRow::from)
        .collect())
}
