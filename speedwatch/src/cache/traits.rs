//! Core traits for the response cache.
//!
//! The `ResponseCache` trait provides a key-value interface for storing remote
//! responses alongside the time they were received. The request cache layer
//! uses it to implement its fetch strategies without caring which backend
//! holds the data.
//!
//! # Design Principles
//!
//! - **String keys**: Request URLs are used directly as keys
//! - **Opaque bodies**: Response bodies are raw bytes, parsed by callers
//! - **Stored-at timestamps**: Freshness is judged by the caller against a
//!   per-class TTL, never by the cache itself
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A remote response held in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Raw response body.
    pub body: Vec<u8>,
    /// When the response was received (ms since UNIX epoch).
    pub stored_at_ms: i64,
}

impl CachedResponse {
    /// Create a cached response stamped with the given time.
    pub fn new(body: Vec<u8>, stored_at: DateTime<Utc>) -> Self {
        Self {
            body,
            stored_at_ms: stored_at.timestamp_millis(),
        }
    }

    /// When the response was received.
    pub fn stored_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.stored_at_ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Age of the response at `now`. Clock skew into the future counts as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let age_ms = now.timestamp_millis().saturating_sub(self.stored_at_ms);
        Duration::from_millis(age_ms.max(0) as u64)
    }

    /// Returns true if the response is older than `ttl` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

/// Errors from a response cache backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseCacheError {
    /// The key is longer than the backend accepts.
    #[error("Cache key of {size} bytes exceeds the {max} byte limit")]
    KeyTooLarge { size: usize, max: usize },

    /// The backend failed for another reason.
    #[error("Response cache backend failed: {0}")]
    Backend(String),
}

/// Generic cache interface for remote responses.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; the request cache layer shares
/// one instance between the caller and background revalidation tasks.
pub trait ResponseCache: Send + Sync {
    /// Store a response under `key`, replacing any previous value.
    fn set(
        &self,
        key: &str,
        value: CachedResponse,
    ) -> BoxFuture<'_, Result<(), ResponseCacheError>>;

    /// Retrieve a response by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(response))` if the key exists
    /// - `Ok(None)` if the key is not found
    /// - `Err(_)` if an error occurs
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<CachedResponse>, ResponseCacheError>>;

    /// Delete a response by key, returning whether it existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ResponseCacheError>>;

    /// Get the current number of entries in the cache.
    fn entry_count(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_cached_response_age() {
        let response = CachedResponse::new(vec![1], at_ms(1_000));
        assert_eq!(response.age(at_ms(61_000)), Duration::from_secs(60));
        assert_eq!(response.stored_at(), at_ms(1_000));
    }

    #[test]
    fn test_cached_response_future_timestamp_is_zero_age() {
        let response = CachedResponse::new(vec![1], at_ms(10_000));
        assert_eq!(response.age(at_ms(5_000)), Duration::ZERO);
    }

    #[test]
    fn test_cached_response_staleness() {
        let response = CachedResponse::new(vec![], at_ms(0));
        let ttl = Duration::from_secs(300);
        assert!(!response.is_stale(at_ms(300_000), ttl));
        assert!(response.is_stale(at_ms(300_001), ttl));
    }

    #[test]
    fn test_cache_error_display() {
        let err = ResponseCacheError::KeyTooLarge { size: 100, max: 50 };
        assert_eq!(
            err.to_string(),
            "Cache key of 100 bytes exceeds the 50 byte limit"
        );
    }
}
