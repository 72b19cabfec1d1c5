//! The geo cache: speed limits indexed by location cell.
//!
//! [`GeoCacheStore`] keeps a snapshot of `cell key -> entry` in an injected
//! [`KeyValueStore`]. Every mutation reads the whole snapshot, modifies it
//! and writes it back. Nothing coordinates writers in other processes, so a
//! concurrent write can be lost; the cache is advisory and a lost entry only
//! means a later lookup falls through to "unknown".
//!
//! # Cleanup
//!
//! ```text
//! put ──► insert ──► utilization >= 80% or last cleanup > 6h ago? ──► cleanup
//!                                                                      │
//! persist ◄────────────────────────────────────────────────────────────┘
//!    │
//!    └─ quota exceeded ──► aggressive cleanup, retry once
//!                              └─ still exceeded ──► wipe cache
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;

use super::entry::{
    cleanup_snapshot, CacheHit, CleanupResult, GeoCacheConfig, GeoCacheEntry, Snapshot,
    LAST_CLEANUP_KEY, SNAPSHOT_KEY,
};
use super::store::{KeyValueStore, StoreError};
use crate::coord;
use crate::units::SpeedUnit;

/// What happened to a put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Entry written.
    Stored,
    /// Entry written after the store rejected the first attempt as full.
    StoredAfterCleanup,
    /// Store stayed full even after aggressive cleanup; the cache was wiped
    /// and the entry dropped.
    Wiped,
    /// Coordinates were invalid; nothing written.
    InvalidCoordinates,
    /// The store failed for a reason other than quota; nothing written.
    Failed(String),
}

/// Point-in-time view of the geo cache.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCacheStats {
    pub entries: usize,
    pub max_entries: usize,
    /// `entries / max_entries`.
    pub utilization: f64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub last_cleanup: Option<DateTime<Utc>>,
}

/// Speed limits cached by location cell, persisted through a key-value store.
pub struct GeoCacheStore {
    store: Arc<dyn KeyValueStore>,
    config: GeoCacheConfig,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for GeoCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoCacheStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeoCacheStore {
    /// Create a geo cache over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>, config: GeoCacheConfig) -> Self {
        Self {
            store,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// The cache limits in effect.
    pub fn config(&self) -> &GeoCacheConfig {
        &self.config
    }

    /// Record a speed limit for a position, stamped with the current time.
    pub async fn put(
        &self,
        lat: f64,
        lon: f64,
        speed_limit: u32,
        unit: SpeedUnit,
        road_name: Option<String>,
    ) -> PutOutcome {
        self.put_at(lat, lon, speed_limit, unit, road_name, Utc::now())
            .await
    }

    /// Record a speed limit for a position, stamped with `now`.
    pub async fn put_at(
        &self,
        lat: f64,
        lon: f64,
        speed_limit: u32,
        unit: SpeedUnit,
        road_name: Option<String>,
        now: DateTime<Utc>,
    ) -> PutOutcome {
        let cell_key = match coord::encode_cell_key(lat, lon) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(error = %e, "Geo cache put skipped");
                return PutOutcome::InvalidCoordinates;
            }
        };

        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_snapshot().await;

        tracing::debug!(cell = %cell_key, speed_limit, %unit, "Geo cache put");
        snapshot.insert(
            cell_key.as_str().to_string(),
            GeoCacheEntry {
                cell_key,
                speed_limit,
                unit,
                road_name,
                lat,
                lon,
                timestamp_ms: now.timestamp_millis(),
            },
        );

        if self.cleanup_due(snapshot.len(), now).await {
            let result = cleanup_snapshot(&mut snapshot, &self.config, false, now);
            self.log_cleanup(&result, false);
            self.record_cleanup(now).await;
        }

        self.persist(&mut snapshot, now).await
    }

    /// Look up the limit for a position at the current time.
    pub async fn get(&self, lat: f64, lon: f64) -> Option<CacheHit> {
        self.get_at(lat, lon, Utc::now()).await
    }

    /// Look up the limit for a position at `now`.
    ///
    /// Tries the exact cell first. If it is missing or expired, probes the
    /// neighbouring cells and returns the freshest valid entry tagged as
    /// nearby.
    pub async fn get_at(&self, lat: f64, lon: f64, now: DateTime<Utc>) -> Option<CacheHit> {
        let key = coord::encode_cell_key(lat, lon).ok()?;
        let snapshot = self.load_snapshot().await;

        if let Some(entry) = snapshot.get(key.as_str()) {
            if !entry.is_expired(now, self.config.ttl) {
                tracing::debug!(cell = %key, "Geo cache exact hit");
                return Some(CacheHit {
                    entry: entry.clone(),
                    is_nearby: false,
                });
            }
        }

        let neighbors = coord::neighbor_cell_keys(lat, lon).ok()?;
        let nearby = neighbors
            .iter()
            .filter_map(|k| snapshot.get(k.as_str()))
            .filter(|e| !e.is_expired(now, self.config.ttl))
            .max_by_key(|e| e.timestamp_ms)?;

        tracing::debug!(cell = %key, neighbor = %nearby.cell_key, "Geo cache nearby hit");
        Some(CacheHit {
            entry: nearby.clone(),
            is_nearby: true,
        })
    }

    /// Run a cleanup pass now, returning the remaining entry count.
    pub async fn cleanup(&self, aggressive: bool) -> usize {
        self.cleanup_at(aggressive, Utc::now()).await
    }

    /// Run a cleanup pass judged at `now`, returning the remaining entry count.
    pub async fn cleanup_at(&self, aggressive: bool, now: DateTime<Utc>) -> usize {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_snapshot().await;

        let result = cleanup_snapshot(&mut snapshot, &self.config, aggressive, now);
        self.log_cleanup(&result, aggressive);
        self.record_cleanup(now).await;

        match self.persist(&mut snapshot, now).await {
            PutOutcome::Wiped | PutOutcome::Failed(_) => 0,
            _ => snapshot.len(),
        }
    }

    /// Remove every entry and the cleanup timestamp.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(SNAPSHOT_KEY).await?;
        self.store.remove(LAST_CLEANUP_KEY).await?;
        tracing::info!("Geo cache cleared");
        Ok(())
    }

    /// Number of entries currently persisted (expired ones included).
    pub async fn len(&self) -> usize {
        self.load_snapshot().await.len()
    }

    /// True if nothing is persisted.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot statistics.
    pub async fn stats(&self) -> GeoCacheStats {
        let snapshot = self.load_snapshot().await;
        let oldest = snapshot.values().map(|e| e.timestamp_ms).min();
        let newest = snapshot.values().map(|e| e.timestamp_ms).max();
        let to_time = |ms: i64| Utc.timestamp_millis_opt(ms).single();

        GeoCacheStats {
            entries: snapshot.len(),
            max_entries: self.config.max_entries,
            utilization: if self.config.max_entries == 0 {
                0.0
            } else {
                snapshot.len() as f64 / self.config.max_entries as f64
            },
            oldest: oldest.and_then(to_time),
            newest: newest.and_then(to_time),
            last_cleanup: self.last_cleanup().await,
        }
    }

    /// When cleanup last ran, if ever.
    pub async fn last_cleanup(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.read(LAST_CLEANUP_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read geo cache cleanup time");
                return None;
            }
        };
        let ms: i64 = raw.trim().parse().ok()?;
        Utc.timestamp_millis_opt(ms).single()
    }

    async fn cleanup_due(&self, entries: usize, now: DateTime<Utc>) -> bool {
        if entries >= self.config.cleanup_watermark() {
            return true;
        }
        match self.last_cleanup().await {
            Some(last) => {
                let elapsed_ms = now.timestamp_millis().saturating_sub(last.timestamp_millis());
                elapsed_ms > self.config.cleanup_interval.as_millis() as i64
            }
            None => true,
        }
    }

    async fn record_cleanup(&self, now: DateTime<Utc>) {
        let value = now.timestamp_millis().to_string();
        if let Err(e) = self.store.write(LAST_CLEANUP_KEY, value).await {
            tracing::warn!(error = %e, "Failed to record geo cache cleanup time");
        }
    }

    /// Read the snapshot; a missing, unreadable or corrupt one reads as empty.
    async fn load_snapshot(&self) -> Snapshot {
        let raw = match self.store.read(SNAPSHOT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Snapshot::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read geo cache, treating as empty");
                return Snapshot::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Corrupt geo cache snapshot, treating as empty");
            Snapshot::new()
        })
    }

    /// Write the snapshot, recovering from a full store.
    async fn persist(&self, snapshot: &mut Snapshot, now: DateTime<Utc>) -> PutOutcome {
        match self.write_snapshot(snapshot).await {
            Ok(()) => return PutOutcome::Stored,
            Err(e) if e.is_quota_exceeded() => {
                tracing::warn!(
                    entries = snapshot.len(),
                    error = %e,
                    "Geo cache store full, running aggressive cleanup"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist geo cache");
                return PutOutcome::Failed(e.to_string());
            }
        }

        let result = cleanup_snapshot(snapshot, &self.config, true, now);
        self.log_cleanup(&result, true);
        self.record_cleanup(now).await;

        match self.write_snapshot(snapshot).await {
            Ok(()) => PutOutcome::StoredAfterCleanup,
            Err(e) => {
                tracing::warn!(error = %e, "Geo cache still does not fit, wiping");
                snapshot.clear();
                if let Err(e) = self.store.remove(SNAPSHOT_KEY).await {
                    tracing::warn!(error = %e, "Failed to wipe geo cache");
                }
                PutOutcome::Wiped
            }
        }
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_string(snapshot).map_err(|e| {
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        self.store.write(SNAPSHOT_KEY, raw).await
    }

    fn log_cleanup(&self, result: &CleanupResult, aggressive: bool) {
        if result.expired > 0 || result.evicted > 0 {
            tracing::info!(
                expired = result.expired,
                evicted = result.evicted,
                remaining = result.remaining,
                aggressive,
                "Geo cache cleanup"
            );
        } else {
            tracing::debug!(remaining = result.remaining, aggressive, "Geo cache cleanup");
        }
    }
}
