//! Location-indexed speed limit cache.
//!
//! Speed limits are stored per location cell (see [`crate::coord`]) so that
//! a previously seen limit can still be shown when the network is gone.
//! Lookups fall back from the exact cell to its neighbours; results from a
//! neighbour are tagged as nearby.
//!
//! The cache persists as a single JSON snapshot through a [`KeyValueStore`]:
//! [`FileStore`] on disk, [`MemoryStore`] for tests and ephemeral sessions.

mod entry;
mod geo_store;
mod store;

pub use entry::{
    cleanup_snapshot, CacheHit, CleanupResult, GeoCacheConfig, GeoCacheEntry, Snapshot,
    CLEANUP_INTERVAL, CLEANUP_UTILIZATION, ENTRY_TTL, LAST_CLEANUP_KEY, MAX_ENTRIES, SNAPSHOT_KEY,
};
pub use geo_store::{GeoCacheStats, GeoCacheStore, PutOutcome};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
