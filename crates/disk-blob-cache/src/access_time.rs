//! Last-access timestamps for eviction ordering
//!
//! Eviction removes the least recently accessed entries first. Not every
//! platform or mount reports an access time: Linux filesystems mounted with
//! `noatime` never update it, and `relatime` updates it at most once a day.
//! When the platform reports no access time, [`PlatformAccessTime`] falls
//! back to the modification time, and eviction order degrades to least
//! recently *written* first.

use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::io;
use std::time::SystemTime;

/// Source of the timestamp used to order cache entries for eviction
pub trait AccessTimeProvider: Send + Sync {
    fn last_access(&self, key: &str, metadata: &Metadata) -> io::Result<DateTime<Utc>>;
}

/// Platform access time, falling back to modification time when unsupported
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformAccessTime;

impl AccessTimeProvider for PlatformAccessTime {
    fn last_access(&self, _key: &str, metadata: &Metadata) -> io::Result<DateTime<Utc>> {
        let time: SystemTime = match metadata.accessed() {
            Ok(atime) => atime,
            Err(_) => metadata.modified()?,
        };
        Ok(time.into())
    }
}

/// Modification time only, for caches on `noatime` mounts
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedTimeOnly;

impl AccessTimeProvider for ModifiedTimeOnly {
    fn last_access(&self, _key: &str, metadata: &Metadata) -> io::Result<DateTime<Utc>> {
        Ok(metadata.modified()?.into())
    }
}
