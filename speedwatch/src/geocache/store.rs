//! Key-value persistence backends for the geo cache.
//!
//! The geo cache persists its whole snapshot as one string value under a
//! fixed key. Backends only need to read, write and remove whole values;
//! there are no partial updates and no locking between processes, so the
//! last writer wins.
//!
//! # Quotas
//!
//! Both backends accept an optional byte quota. A write that would exceed it
//! fails with [`StoreError::QuotaExceeded`]. [`FileStore`] also reports a
//! full disk as [`StoreError::StorageFull`]. The geo cache answers either
//! with an aggressive cleanup and a single retry.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::cache::BoxFuture;

/// Errors from a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would exceed the backend's storage quota.
    #[error("Storage quota exceeded: need {needed} bytes, quota {quota}")]
    QuotaExceeded { needed: u64, quota: u64 },

    /// The filesystem ran out of space or hit a disk quota.
    #[error("Storage full: {0}")]
    StorageFull(io::Error),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Key is not usable by this backend.
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    /// True if the error is a full store rather than a broken one.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            StoreError::QuotaExceeded { .. } | StoreError::StorageFull(_)
        )
    }
}

/// ENOSPC on Linux and macOS.
const ENOSPC: i32 = 28;

fn is_storage_full(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded
    ) || e.raw_os_error() == Some(ENOSPC)
}

/// Classify a failed write, keeping out-of-space apart from other I/O errors.
fn write_error(e: io::Error) -> StoreError {
    if is_storage_full(&e) {
        StoreError::StorageFull(e)
    } else {
        StoreError::Io(e)
    }
}

/// Whole-value key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn read(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StoreError>>;

    /// Replace the value stored under `key`.
    fn write(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// In-memory store, used for tests and sessions without a data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    /// Create an unbounded memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store limited to `quota_bytes` across all values.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently stored (keys + values).
    pub fn used_bytes(&self) -> u64 {
        self.values
            .lock()
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        let value = self.values.lock().get(key).cloned();
        Box::pin(async move { Ok(value) })
    }

    fn write(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = {
            let mut values = self.values.lock();
            let others: u64 = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| (k.len() + v.len()) as u64)
                .sum();
            let needed = others + (key.len() + value.len()) as u64;

            match self.quota_bytes {
                Some(quota) if needed > quota => Err(StoreError::QuotaExceeded { needed, quota }),
                _ => {
                    values.insert(key.to_string(), value);
                    Ok(())
                }
            }
        };
        Box::pin(async move { result })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        self.values.lock().remove(key);
        Box::pin(async move { Ok(()) })
    }
}

/// File-backed store: one `<key>.json` file per key in a directory.
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileStore {
    /// Create a store rooted at `directory` (created on first write).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            quota_bytes: None,
        }
    }

    /// Limit a single value to `quota_bytes`.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Directory holding the value files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.directory.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            match tokio::fs::read_to_string(&path).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn write(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), StoreError>> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            let needed = value.len() as u64;
            if let Some(quota) = self.quota_bytes {
                if needed > quota {
                    return Err(StoreError::QuotaExceeded { needed, quota });
                }
            }

            tokio::fs::create_dir_all(&self.directory).await?;

            // Write to temp file first, then rename for atomicity
            let temp_path = path.with_extension("tmp");
            let written = match tokio::fs::write(&temp_path, value.as_bytes()).await {
                Ok(()) => tokio::fs::rename(&temp_path, &path).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                // Drop the partial temp file so it does not hold on to space
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(write_error(e));
            }
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.read("k").await.unwrap(), None);

        store.write("k", "v".to_string()).await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), Some("v".to_string()));

        store.remove("k").await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_quota() {
        let store = MemoryStore::with_quota(10);

        store.write("a", "12345".to_string()).await.unwrap();
        let err = store.write("b", "123456".to_string()).await.unwrap_err();
        assert!(err.is_quota_exceeded());

        // Replacing a value only counts the new size
        store.write("a", "123456789".to_string()).await.unwrap();
        assert_eq!(store.used_bytes(), 10);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("cache"));

        assert_eq!(store.read("snapshot").await.unwrap(), None);

        store.write("snapshot", "{}".to_string()).await.unwrap();
        assert_eq!(store.read("snapshot").await.unwrap(), Some("{}".to_string()));
        assert!(dir.path().join("cache/snapshot.json").exists());
        assert!(!dir.path().join("cache/snapshot.tmp").exists());

        store.remove("snapshot").await.unwrap();
        store.remove("snapshot").await.unwrap();
        assert_eq!(store.read("snapshot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_quota() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).with_quota(4);

        let err = store.write("k", "12345".to_string()).await.unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_file_store_reports_full_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/dev/full", dir.path().join("snapshot.tmp")).unwrap();
        let store = FileStore::new(dir.path());

        let err = store.write("snapshot", "{}".to_string()).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageFull(_)));
        assert!(err.is_quota_exceeded());
        assert!(!dir.path().join("snapshot.tmp").exists());

        // The dead temp file is gone, so the next write goes through
        store.write("snapshot", "{}".to_string()).await.unwrap();
        assert_eq!(store.read("snapshot").await.unwrap(), Some("{}".to_string()));
    }

    #[test]
    fn test_write_error_classification() {
        let full = io::Error::from_raw_os_error(ENOSPC);
        assert!(matches!(write_error(full), StoreError::StorageFull(_)));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "ro");
        assert!(matches!(write_error(denied), StoreError::Io(_)));
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let err = store.write("../escape", "x".to_string()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
