//! Flat-directory blob cache with size-bounded eviction
//!
//! Entries are files named by their key under a single root directory. When
//! the total size reaches a ceiling, an eviction pass removes the least
//! recently accessed entries until the cache is back down to a floor. Passes
//! are serialized process-wide by an [`EvictionCoordinator`].

pub mod access_time;
pub mod coordinator;
pub mod error;
pub mod eviction;
pub mod store;
mod types;

pub use access_time::{AccessTimeProvider, ModifiedTimeOnly, PlatformAccessTime};
pub use coordinator::EvictionCoordinator;
pub use error::{CacheError, Result};
pub use eviction::{evict, plan, EvictionPlan};
pub use store::{validate_key, CacheStore, DiskCache};
pub use types::{CacheEntry, EvictionReport};
