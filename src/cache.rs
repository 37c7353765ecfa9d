//! In-memory response cache with timed revalidation
//!
//! Each successful response is kept under its request URL together with the
//! revalidate window it was fetched with. A cached body is served only while
//! it is younger than that window; afterwards the next fetch overwrites it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// A cached response body
#[derive(Debug, Clone)]
struct CachedResponse {
    body: serde_json::Value,
    fetched_at: DateTime<Utc>,
    revalidate: Duration,
}

impl CachedResponse {
    fn age(&self) -> Duration {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age.to_std().unwrap_or_default()
    }

    fn is_fresh(&self) -> bool {
        self.age() <= self.revalidate
    }
}

/// URL-keyed response cache
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the body for `url` if it is still within its revalidate window
    pub async fn get(&self, url: &str) -> Option<serde_json::Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(url)?;
        if entry.is_fresh() {
            tracing::trace!(url, age_ms = entry.age().as_millis() as u64, "Cache hit");
            Some(entry.body.clone())
        } else {
            None
        }
    }

    /// Stores a body; a zero revalidate window stores nothing
    ///
    /// Entries past their window are dropped on every insert.
    pub async fn insert(&self, url: &str, body: serde_json::Value, revalidate_secs: u64) {
        if revalidate_secs == 0 {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh());
        entries.insert(
            url.to_string(),
            CachedResponse {
                body,
                fetched_at: Utc::now(),
                revalidate: Duration::from_secs(revalidate_secs),
            },
        );
    }

    /// Number of stored entries, fresh or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    #[cfg(test)]
    async fn backdate(&self, url: &str, by: chrono::Duration) {
        if let Some(entry) = self.entries.write().await.get_mut(url) {
            entry.fetched_at -= by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fresh_entry_is_served() {
        let cache = ResponseCache::new();
        cache.insert("u", json!({"a": 1}), 60).await;
        assert_eq!(cache.get("u").await, Some(json!({"a": 1})));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn test_stale_entry_is_a_miss() {
        let cache = ResponseCache::new();
        cache.insert("u", json!([1, 2]), 30).await;
        cache.backdate("u", chrono::Duration::seconds(31)).await;
        assert_eq!(cache.get("u").await, None);
        assert_eq!(cache.len().await, 1);

        cache.insert("u", json!([3]), 30).await;
        assert_eq!(cache.get("u").await, Some(json!([3])));
    }

    #[tokio::test]
    async fn test_insert_drops_expired_entries() {
        let cache = ResponseCache::new();
        cache.insert("old", json!("a"), 30).await;
        cache.insert("live", json!("b"), 300).await;
        cache.backdate("old", chrono::Duration::seconds(60)).await;
        cache.backdate("live", chrono::Duration::seconds(60)).await;

        cache.insert("new", json!("c"), 30).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("old").await, None);
        assert_eq!(cache.get("live").await, Some(json!("b")));
    }

    #[tokio::test]
    async fn test_zero_revalidate_is_not_stored() {
        let cache = ResponseCache::new();
        cache.insert("u", json!(null), 0).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ResponseCache::new();
        cache.insert("a", json!(1), 10).await;
        cache.insert("b", json!(2), 10).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
