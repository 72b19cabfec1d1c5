//! In-memory response cache using moka.
//!
//! This provider wraps `moka::future::Cache` to provide an async-safe,
//! lock-free response store with automatic LRU eviction by entry count.
//!
//! # No TTL
//!
//! Entries are never expired by moka. Stale-while-revalidate must be able to
//! serve a response older than its class TTL, so freshness is judged by the
//! request cache layer from `CachedResponse::stored_at_ms` instead.

use moka::future::Cache as MokaCache;

use crate::cache::traits::{BoxFuture, CachedResponse, ResponseCache, ResponseCacheError};

/// Default maximum number of cached responses.
pub const DEFAULT_MAX_RESPONSES: u64 = 2_000;

/// Longest key accepted (URLs beyond this are refused).
pub const MAX_KEY_BYTES: usize = 2_048;

/// In-memory response cache provider using moka.
pub struct MemoryResponseCache {
    /// The underlying moka cache.
    cache: MokaCache<String, CachedResponse>,

    /// Maximum number of entries.
    max_entries: u64,
}

impl MemoryResponseCache {
    /// Create a new memory cache holding at most `max_entries` responses.
    pub fn new(max_entries: u64) -> Self {
        let cache = MokaCache::builder().max_capacity(max_entries).build();

        Self { cache, max_entries }
    }

    /// Maximum number of entries the cache will hold.
    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    /// Apply pending evictions so `entry_count` is exact.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MemoryResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESPONSES)
    }
}

impl ResponseCache for MemoryResponseCache {
    fn set(
        &self,
        key: &str,
        value: CachedResponse,
    ) -> BoxFuture<'_, Result<(), ResponseCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            if key.len() > MAX_KEY_BYTES {
                return Err(ResponseCacheError::KeyTooLarge {
                    size: key.len(),
                    max: MAX_KEY_BYTES,
                });
            }
            self.cache.insert(key, value).await;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<CachedResponse>, ResponseCacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ResponseCacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.remove(&key).await.is_some()) })
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn response(body: &[u8]) -> CachedResponse {
        CachedResponse::new(body.to_vec(), Utc::now())
    }

    #[tokio::test]
    async fn test_memory_cache_new() {
        let cache = MemoryResponseCache::new(10);
        assert_eq!(cache.max_entries(), 10);
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_cache_set_and_get() {
        let cache = MemoryResponseCache::default();
        let value = response(b"{}");

        cache.set("key1", value.clone()).await.unwrap();

        assert_eq!(cache.get("key1").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_memory_cache_get_missing() {
        let cache = MemoryResponseCache::default();
        assert!(cache.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_delete() {
        let cache = MemoryResponseCache::default();
        cache.set("key1", response(b"a")).await.unwrap();

        assert!(cache.delete("key1").await.unwrap());
        assert!(!cache.delete("key1").await.unwrap());
        assert!(cache.get("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_replace_existing() {
        let cache = MemoryResponseCache::default();

        cache.set("key1", response(b"old")).await.unwrap();
        cache.set("key1", response(b"new")).await.unwrap();
        cache.sync().await;

        let value = cache.get("key1").await.unwrap().unwrap();
        assert_eq!(value.body, b"new".to_vec());
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_rejects_oversized_key() {
        let cache = MemoryResponseCache::default();
        let key = "k".repeat(MAX_KEY_BYTES + 1);

        let result = cache.set(&key, response(b"a")).await;
        assert!(matches!(
            result,
            Err(ResponseCacheError::KeyTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_cache_capacity_eviction() {
        let cache = MemoryResponseCache::new(5);

        for i in 0..20 {
            cache.set(&format!("key{}", i), response(b"x")).await.unwrap();
        }
        cache.sync().await;

        assert!(
            cache.entry_count() <= 5,
            "Expected at most 5 entries, got {}",
            cache.entry_count()
        );
    }
}
