//! Response caching for remote requests.
//!
//! This module provides the request cache layer: a generic response cache
//! ([`ResponseCache`], backed by moka in [`MemoryResponseCache`]) plus the
//! fetch strategies that decide when the cache or the network answers
//! ([`RequestCacheLayer`]).
//!
//! It is independent of the geo cache, which indexes speed limits by
//! location rather than by request URL.

mod providers;
mod strategy;
mod traits;

pub use providers::{MemoryResponseCache, DEFAULT_MAX_RESPONSES, MAX_KEY_BYTES};
pub use strategy::{
    FetchError, FetchOutcome, FetchStrategy, RequestCacheLayer, ResponseClass, ResponseOrigin,
    LOOK_AHEAD_TTL, SPEED_LIMIT_TTL, WEATHER_TTL,
};
pub use traits::{BoxFuture, CachedResponse, ResponseCache, ResponseCacheError};
