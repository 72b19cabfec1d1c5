//! Fetch strategies for remote requests.
//!
//! The [`RequestCacheLayer`] sits between callers and the HTTP client and
//! decides, per request class, whether the cache or the network answers:
//!
//! ```text
//! CacheFirst            cached? ──yes──► cached
//!                          └─no──► network ──ok──► store, return
//!
//! NetworkFirst          network ──ok──► store, return
//!                          └─err──► cached? ──yes──► cached
//!                                       └─no──► OfflineNotCached
//!
//! StaleWhileRevalidate  cached? ──yes──► cached now, refresh in background
//!                          └─no──► network ──ok──► store, return
//!                                     └─err──► OfflineNotCached
//! ```
//!
//! Freshness is judged against a per-class TTL. Stale responses are still
//! served; the outcome reports whether they were stale so callers can flag
//! them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use super::traits::{CachedResponse, ResponseCache};
use crate::provider::{AsyncHttpClient, ProviderError};

/// TTL for speed-limit responses.
pub const SPEED_LIMIT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// TTL for weather responses.
pub const WEATHER_TTL: Duration = Duration::from_secs(30 * 60);

/// TTL for look-ahead (upcoming limits) responses.
pub const LOOK_AHEAD_TTL: Duration = Duration::from_secs(5 * 60);

/// How a request is satisfied from cache and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Serve from cache when present, otherwise fetch and store.
    CacheFirst,
    /// Fetch first, fall back to the cached copy on failure.
    NetworkFirst,
    /// Serve the cached copy immediately and refresh it in the background.
    StaleWhileRevalidate,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::CacheFirst => write!(f, "cache-first"),
            FetchStrategy::NetworkFirst => write!(f, "network-first"),
            FetchStrategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
        }
    }
}

/// Class of remote response, which fixes its TTL and default strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Static application assets.
    Static,
    /// Speed-limit lookups.
    SpeedLimit,
    /// Weather alerts.
    Weather,
    /// Upcoming-limit (look-ahead) queries.
    LookAhead,
}

impl ResponseClass {
    /// Age after which a response of this class is considered stale.
    ///
    /// `None` means the response never goes stale.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            ResponseClass::Static => None,
            ResponseClass::SpeedLimit => Some(SPEED_LIMIT_TTL),
            ResponseClass::Weather => Some(WEATHER_TTL),
            ResponseClass::LookAhead => Some(LOOK_AHEAD_TTL),
        }
    }

    /// Strategy used when the caller does not pick one.
    pub fn default_strategy(&self) -> FetchStrategy {
        match self {
            ResponseClass::Static => FetchStrategy::CacheFirst,
            ResponseClass::SpeedLimit => FetchStrategy::StaleWhileRevalidate,
            ResponseClass::Weather | ResponseClass::LookAhead => FetchStrategy::NetworkFirst,
        }
    }
}

/// Where a response body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOrigin {
    /// Fetched from the network during this call.
    Network,
    /// Served from the cache.
    Cache {
        /// True if the response was older than its class TTL.
        stale: bool,
    },
}

impl ResponseOrigin {
    /// True if the response came from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, ResponseOrigin::Cache { .. })
    }

    /// True if the response came from the cache and was past its TTL.
    pub fn is_stale(&self) -> bool {
        matches!(self, ResponseOrigin::Cache { stale: true })
    }
}

/// A successfully obtained response.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Response body.
    pub body: Vec<u8>,
    /// Where the body came from.
    pub origin: ResponseOrigin,
    /// Age of the body when returned (zero for network responses).
    pub age: Duration,
    /// True if a background refresh was started for this key.
    pub revalidating: bool,
}

/// Failure to obtain a response from either the network or the cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The network request failed and no cached copy exists.
    #[error("Offline and not cached: {url} ({cause})")]
    OfflineNotCached { url: String, cause: ProviderError },
}

/// Applies fetch strategies over an HTTP client and a response cache.
///
/// Cloning is cheap; clones share the client, cache and in-flight set, which
/// is what lets background refreshes outlive the call that started them.
#[derive(Clone)]
pub struct RequestCacheLayer {
    client: Arc<dyn AsyncHttpClient>,
    cache: Arc<dyn ResponseCache>,
    /// Keys with a background refresh in flight.
    revalidating: Arc<Mutex<HashSet<String>>>,
}

impl fmt::Debug for RequestCacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCacheLayer")
            .field("cached_entries", &self.cache.entry_count())
            .field("revalidating", &self.revalidating.lock().len())
            .finish_non_exhaustive()
    }
}

impl RequestCacheLayer {
    /// Create a layer over the given client and cache.
    pub fn new(client: Arc<dyn AsyncHttpClient>, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            client,
            cache,
            revalidating: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The underlying response cache.
    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// Number of background refreshes currently in flight.
    pub fn pending_revalidations(&self) -> usize {
        self.revalidating.lock().len()
    }

    /// Fetch `url` using the class's default strategy.
    pub async fn fetch(&self, url: &str, class: ResponseClass) -> Result<FetchOutcome, FetchError> {
        self.fetch_with(url, class, class.default_strategy(), Utc::now())
            .await
    }

    /// Fetch `url` with an explicit strategy, judging freshness at `now`.
    pub async fn fetch_with(
        &self,
        url: &str,
        class: ResponseClass,
        strategy: FetchStrategy,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome, FetchError> {
        tracing::debug!(url, %strategy, "Request cache fetch");

        match strategy {
            FetchStrategy::CacheFirst => self.cache_first(url, class, now).await,
            FetchStrategy::NetworkFirst => self.network_first(url, class, now).await,
            FetchStrategy::StaleWhileRevalidate => {
                self.stale_while_revalidate(url, class, now).await
            }
        }
    }

    async fn cache_first(
        &self,
        url: &str,
        class: ResponseClass,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome, FetchError> {
        if let Some(cached) = self.lookup(url).await {
            return Ok(Self::from_cache(cached, class, now, false));
        }

        match self.client.get(url).await {
            Ok(body) => {
                self.store(url, &body, now).await;
                Ok(Self::from_network(body))
            }
            Err(cause) => Err(Self::offline(url, cause)),
        }
    }

    async fn network_first(
        &self,
        url: &str,
        class: ResponseClass,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome, FetchError> {
        match self.client.get(url).await {
            Ok(body) => {
                self.store(url, &body, now).await;
                Ok(Self::from_network(body))
            }
            Err(cause) => {
                tracing::debug!(url, error = %cause, "Network failed, trying cache");
                match self.lookup(url).await {
                    Some(cached) => Ok(Self::from_cache(cached, class, now, false)),
                    None => Err(Self::offline(url, cause)),
                }
            }
        }
    }

    async fn stale_while_revalidate(
        &self,
        url: &str,
        class: ResponseClass,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome, FetchError> {
        if let Some(cached) = self.lookup(url).await {
            let revalidating = self.spawn_revalidation(url);
            return Ok(Self::from_cache(cached, class, now, revalidating));
        }

        match self.client.get(url).await {
            Ok(body) => {
                self.store(url, &body, now).await;
                Ok(Self::from_network(body))
            }
            Err(cause) => Err(Self::offline(url, cause)),
        }
    }

    /// Start a background refresh of `url` unless one is already running.
    ///
    /// Returns true if a refresh is in flight after the call.
    fn spawn_revalidation(&self, url: &str) -> bool {
        {
            let mut in_flight = self.revalidating.lock();
            if !in_flight.insert(url.to_string()) {
                return true;
            }
        }

        let layer = self.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            match layer.client.get(&url).await {
                Ok(body) => {
                    layer.store(&url, &body, Utc::now()).await;
                    tracing::debug!(url = %url, "Background revalidation stored fresh response");
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Background revalidation failed");
                }
            }
            layer.revalidating.lock().remove(&url);
        });

        true
    }

    async fn lookup(&self, url: &str) -> Option<CachedResponse> {
        match self.cache.get(url).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url, error = %e, "Response cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, url: &str, body: &[u8], now: DateTime<Utc>) {
        let response = CachedResponse::new(body.to_vec(), now);
        if let Err(e) = self.cache.set(url, response).await {
            tracing::warn!(url, error = %e, "Response cache write failed");
        }
    }

    fn from_cache(
        cached: CachedResponse,
        class: ResponseClass,
        now: DateTime<Utc>,
        revalidating: bool,
    ) -> FetchOutcome {
        let stale = class.ttl().is_some_and(|ttl| cached.is_stale(now, ttl));
        FetchOutcome {
            age: cached.age(now),
            body: cached.body,
            origin: ResponseOrigin::Cache { stale },
            revalidating,
        }
    }

    fn from_network(body: Vec<u8>) -> FetchOutcome {
        FetchOutcome {
            body,
            origin: ResponseOrigin::Network,
            age: Duration::ZERO,
            revalidating: false,
        }
    }

    fn offline(url: &str, cause: ProviderError) -> FetchError {
        tracing::warn!(url, error = %cause, "Offline and no cached response");
        FetchError::OfflineNotCached {
            url: url.to_string(),
            cause,
        }
    }
}
