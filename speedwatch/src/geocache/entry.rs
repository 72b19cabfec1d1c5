//! Geo cache entries and configuration.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::CellKey;
use crate::units::SpeedUnit;

/// Maximum number of entries kept after cleanup.
pub const MAX_ENTRIES: usize = 500;

/// Age after which an entry is expired.
pub const ENTRY_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Utilization fraction at which a put triggers cleanup.
pub const CLEANUP_UTILIZATION: f64 = 0.8;

/// Interval after which a put triggers cleanup regardless of size.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Store key holding the serialized snapshot.
pub const SNAPSHOT_KEY: &str = "speed_limit_cache";

/// Store key holding the last cleanup time (ms since UNIX epoch).
pub const LAST_CLEANUP_KEY: &str = "speed_limit_cache_last_cleanup";

/// Persisted snapshot: cell key string to entry.
pub type Snapshot = HashMap<String, GeoCacheEntry>;

/// A speed limit observed for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCacheEntry {
    pub cell_key: CellKey,
    pub speed_limit: u32,
    pub unit: SpeedUnit,
    pub road_name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// When the limit was observed (ms since UNIX epoch).
    pub timestamp_ms: i64,
}

impl GeoCacheEntry {
    /// When the limit was observed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Age at `now`; entries stamped in the future have zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let age_ms = now.timestamp_millis().saturating_sub(self.timestamp_ms);
        Duration::from_millis(age_ms.max(0) as u64)
    }

    /// True if the entry is older than `ttl` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }

    /// The limit expressed in `unit`, rounded to the nearest integer.
    pub fn limit_in(&self, unit: SpeedUnit) -> u32 {
        unit.convert_limit(self.speed_limit, self.unit)
    }
}

/// A geo cache lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub entry: GeoCacheEntry,
    /// True if the entry came from a neighbouring cell.
    pub is_nearby: bool,
}

/// Geo cache limits.
#[derive(Debug, Clone)]
pub struct GeoCacheConfig {
    /// Maximum entries kept after cleanup.
    pub max_entries: usize,
    /// Entry time-to-live.
    pub ttl: Duration,
    /// Utilization fraction that triggers cleanup on put.
    pub cleanup_utilization: f64,
    /// Time since last cleanup that triggers cleanup on put.
    pub cleanup_interval: Duration,
}

impl Default for GeoCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_ENTRIES,
            ttl: ENTRY_TTL,
            cleanup_utilization: CLEANUP_UTILIZATION,
            cleanup_interval: CLEANUP_INTERVAL,
        }
    }
}

impl GeoCacheConfig {
    /// Entry count at or above which a put triggers cleanup.
    pub fn cleanup_watermark(&self) -> usize {
        (self.max_entries as f64 * self.cleanup_utilization).ceil() as usize
    }
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupResult {
    /// Entries dropped for being older than the TTL.
    pub expired: usize,
    /// Entries dropped to get under capacity.
    pub evicted: usize,
    /// Entries left afterwards.
    pub remaining: usize,
}

/// Drop expired entries, then truncate to capacity keeping the newest.
///
/// An aggressive pass truncates to half the capacity.
pub fn cleanup_snapshot(
    snapshot: &mut Snapshot,
    config: &GeoCacheConfig,
    aggressive: bool,
    now: DateTime<Utc>,
) -> CleanupResult {
    let before = snapshot.len();
    snapshot.retain(|_, entry| !entry.is_expired(now, config.ttl));
    let expired = before - snapshot.len();

    let target = if aggressive {
        config.max_entries / 2
    } else {
        config.max_entries
    };

    let mut evicted = 0;
    if snapshot.len() > target {
        let mut by_recency: Vec<(String, i64)> = snapshot
            .iter()
            .map(|(k, e)| (k.clone(), e.timestamp_ms))
            .collect();
        // Newest first; key breaks ties so the result is deterministic
        by_recency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (key, _) in by_recency.into_iter().skip(target) {
            snapshot.remove(&key);
            evicted += 1;
        }
    }

    CleanupResult {
        expired,
        evicted,
        remaining: snapshot.len(),
    }
}
