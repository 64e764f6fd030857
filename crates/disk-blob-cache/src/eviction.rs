//! Size-bounded eviction ordered by last access
//!
//! A pass is a no-op while the cache total is below the ceiling. Once the
//! ceiling is reached, entries are removed oldest access first until the
//! bytes freed reach `total - floor`. Deletes are best-effort: a failed
//! delete is logged, frees nothing, and the pass moves on to the next entry.

use crate::error::Result;
use crate::store::CacheStore;
use crate::types::{CacheEntry, EvictionReport};
use tracing::{debug, info, warn};

/// Deletion order computed from one directory snapshot
#[derive(Debug, Clone)]
pub struct EvictionPlan {
    pub total_size: u64,
    /// Bytes that must be freed to bring the cache down to the floor
    pub to_free: u64,
    /// Candidates, oldest access first. Empty when under budget.
    pub order: Vec<CacheEntry>,
}

impl EvictionPlan {
    /// Entries a pass removes when every delete succeeds
    pub fn prefix(&self) -> &[CacheEntry] {
        let mut freed = 0u64;
        let mut len = 0;
        for entry in &self.order {
            if freed >= self.to_free {
                break;
            }
            freed += entry.size;
            len += 1;
        }
        &self.order[..len]
    }
}

pub fn plan(mut entries: Vec<CacheEntry>, ceiling: u64, floor: u64) -> EvictionPlan {
    let total_size: u64 = entries.iter().map(|e| e.size).sum();

    if total_size < ceiling {
        return EvictionPlan {
            total_size,
            to_free: 0,
            order: Vec::new(),
        };
    }

    // Stable, so equal timestamps keep scan order.
    entries.sort_by_key(|e| e.last_access);

    EvictionPlan {
        total_size,
        to_free: total_size.saturating_sub(floor),
        order: entries,
    }
}

/// Run one eviction pass against `store`
pub async fn evict<S>(store: &S, ceiling: u64, floor: u64) -> Result<EvictionReport>
where
    S: CacheStore + ?Sized,
{
    let entries = store.list_all().await?;
    let scanned = entries.len();
    let plan = plan(entries, ceiling, floor);

    let mut report = EvictionReport {
        scanned,
        total_size: plan.total_size,
        ..Default::default()
    };

    if plan.order.is_empty() {
        debug!(
            total_size = plan.total_size,
            ceiling, "Cache under budget, nothing to evict"
        );
        return Ok(report);
    }

    for entry in &plan.order {
        if report.freed >= plan.to_free {
            break;
        }
        match store.delete(&entry.key).await {
            Ok(()) => {
                report.freed += entry.size;
                report.deleted += 1;
                debug!(key = %entry.key, size = entry.size, "Evicted cache entry");
            }
            Err(e) => {
                report.failed += 1;
                warn!(key = %entry.key, error = %e, "Failed to evict cache entry");
            }
        }
    }

    info!(
        scanned = report.scanned,
        total_size = report.total_size,
        freed = report.freed,
        deleted = report.deleted,
        failed = report.failed,
        "Eviction pass complete"
    );

    Ok(report)
}
