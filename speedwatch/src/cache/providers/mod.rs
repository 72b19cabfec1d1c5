//! Response cache provider implementations.
//!
//! # Available Providers
//!
//! - [`MemoryResponseCache`]: In-memory LRU cache using moka

mod memory;

pub use memory::{MemoryResponseCache, DEFAULT_MAX_RESPONSES, MAX_KEY_BYTES};
