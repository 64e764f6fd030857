//! Flat-directory cache storage

use crate::access_time::{AccessTimeProvider, PlatformAccessTime};
use crate::error::{CacheError, Result};
use crate::types::CacheEntry;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const TEMP_SUFFIX: &str = ".tmp";

/// Storage operations the retrieval path and the eviction engine rely on
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &str) -> bool;

    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `data` under `key`, replacing any previous entry.
    ///
    /// Fails with [`CacheError::OutOfSpace`] when the device is full.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Point-in-time snapshot of every entry, taken by one directory scan.
    async fn list_all(&self) -> Result<Vec<CacheEntry>>;
}

/// Check that a key can be used as a file name directly under the cache root
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

/// Cache entries stored as files named by their key in a single directory
pub struct DiskCache {
    root: PathBuf,
    access_time: Arc<dyn AccessTimeProvider>,
    temp_counter: AtomicU64,
}

impl DiskCache {
    /// Create a cache rooted at `root` using platform access times
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_access_time(root, Arc::new(PlatformAccessTime))
    }

    pub fn with_access_time(
        root: impl Into<PathBuf>,
        access_time: Arc<dyn AccessTimeProvider>,
    ) -> Self {
        Self {
            root: root.into(),
            access_time,
            temp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root and clear temporary files left by interrupted writes
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        let mut removed = 0usize;
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(file = name, error = %e, "Failed to remove stale temp file"),
                }
            }
        }

        info!(cache_dir = ?self.root, stale_temp_removed = removed, "Cache initialized");
        Ok(())
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(".{}.{}{}", key, n, TEMP_SUFFIX))
    }
}

fn not_found_or_io(key: &str, err: io::Error) -> CacheError {
    if err.kind() == io::ErrorKind::NotFound {
        CacheError::NotFound(key.to_string())
    } else {
        err.into()
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn exists(&self, key: &str) -> bool {
        let Ok(path) = self.entry_path(key) else {
            return false;
        };
        fs::try_exists(&path).await.unwrap_or(false)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.entry_path(key)?;
        fs::read(&path).await.map_err(|e| not_found_or_io(key, e))
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.entry_path(key)?;
        let temp = self.temp_path(key);

        // Readers only ever see complete files.
        let result = match fs::write(&temp, data).await {
            Ok(()) => fs::rename(&temp, &path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&temp).await {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(key, error = %cleanup, "Failed to remove temp file after failed write");
                }
            }
            return Err(CacheError::from_write(e));
        }

        debug!(key, size = data.len(), "Cached blob");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))
    }

    async fn list_all(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(key) = file_name.to_str() else {
                continue;
            };
            if validate_key(key).is_err() {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!(key, error = %e, "Failed to read cache entry metadata");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let last_access = match self.access_time.last_access(key, &metadata) {
                Ok(t) => t,
                Err(e) => {
                    warn!(key, error = %e, "Failed to read cache entry access time");
                    continue;
                }
            };

            entries.push(CacheEntry {
                key: key.to_string(),
                size: metadata.len(),
                last_access,
            });
        }

        Ok(entries)
    }
}
