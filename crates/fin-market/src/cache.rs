//! Time-based cache for market data and derived reports

use cached::{Cached, TimedCache};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for market data requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    /// Stock symbol
    pub symbol: String,
    /// Operation type ("history", "kpis", ...)
    pub endpoint: String,
    /// Additional parameters as a JSON string
    pub params: String,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, endpoint: impl Into<String>, params: impl Serialize) -> Self {
        Self {
            symbol: symbol.into(),
            endpoint: endpoint.into(),
            params: serde_json::to_string(&params).unwrap_or_default(),
        }
    }
}

/// Thread-safe TTL cache; clones share storage
#[derive(Clone)]
pub struct MarketCache {
    cache: Arc<RwLock<TimedCache<CacheKey, serde_json::Value>>>,
}

impl MarketCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        // TimedCache evicts on read, so lookups need the write lock
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: CacheKey, value: serde_json::Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value or run `fetcher` and cache its result
    ///
    /// Errors are not cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: CacheKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(&key).await {
            match serde_json::from_value(value) {
                Ok(hit) => {
                    tracing::debug!(symbol = %key.symbol, endpoint = %key.endpoint, "Cache hit");
                    return Ok(hit);
                }
                Err(e) => tracing::warn!(error = %e, "Discarding undecodable cache entry"),
            }
        }

        tracing::debug!(symbol = %key.symbol, endpoint = %key.endpoint, "Cache miss");
        let fetched = fetcher().await?;

        if let Ok(value) = serde_json::to_value(&fetched) {
            self.insert(key, value).await;
        }
        Ok(fetched)
    }

    /// Invalidate a specific cache entry
    pub async fn invalidate(&self, key: &CacheKey) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(key);
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Number of cached entries (expired ones included until touched)
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_insert_and_get() {
        let cache = MarketCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "quote", json!({}));
        let value = json!({"price": 150.0});

        cache.insert(key.clone(), value.clone()).await;
        assert_eq!(cache.get(&key).await, Some(value));
    }

    #[tokio::test]
    async fn test_get_or_fetch_uses_cache() {
        let cache = MarketCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "history", json!({"range": "1mo"}));

        let mut calls = 0;
        let first: Vec<f64> = cache
            .get_or_fetch(key.clone(), || {
                calls += 1;
                async { Ok::<_, String>(vec![1.0, 2.0]) }
            })
            .await
            .unwrap();
        let second: Vec<f64> = cache
            .get_or_fetch(key, || {
                calls += 1;
                async { Ok::<_, String>(vec![9.0]) }
            })
            .await
            .unwrap();

        assert_eq!(first, vec![1.0, 2.0]);
        assert_eq!(second, first);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let cache = MarketCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "kpis", json!({}));

        let failed: Result<u32, String> = cache
            .get_or_fetch(key.clone(), || async { Err("upstream".to_string()) })
            .await;
        assert!(failed.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_expiry() {
        let cache = MarketCache::new(Duration::from_millis(20));
        let key = CacheKey::new("AAPL", "quote", json!({}));
        cache.insert(key.clone(), json!(1)).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = MarketCache::new(Duration::from_secs(60));
        for i in 0..3 {
            cache
                .insert(CacheKey::new(format!("S{i}"), "quote", json!({})), json!(i))
                .await;
        }
        assert_eq!(cache.len().await, 3);

        cache.invalidate(&CacheKey::new("S0", "quote", json!({}))).await;
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
