//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file in the cache root, as observed by a directory scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub size: u64,
    pub last_access: DateTime<Utc>,
}

/// Outcome of a single eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionReport {
    /// Entries seen by the scan
    pub scanned: usize,
    /// Sum of entry sizes at scan time
    pub total_size: u64,
    /// Bytes actually removed
    pub freed: u64,
    pub deleted: usize,
    pub failed: usize,
}

impl EvictionReport {
    /// True when the pass found the cache under budget and removed nothing.
    pub fn is_noop(&self) -> bool {
        self.deleted == 0 && self.failed == 0
    }
}
