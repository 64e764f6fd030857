//! Read path: serve from the disk cache, backfilling from the remote store

use crate::codec::sniff_content_type;
use crate::error::{ProxyError, Result};
use crate::types::CacheStats;
use blob_store_client::RemoteStore;
use disk_blob_cache::{validate_key, CacheStore, EvictionCoordinator};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Image bytes ready to serve
#[derive(Debug)]
pub struct Retrieved {
    pub data: Vec<u8>,
    pub content_type: &'static str,
    pub from_cache: bool,
}

pub struct RetrievalProxy {
    store: Arc<dyn CacheStore>,
    remote: Arc<dyn RemoteStore>,
    eviction: Arc<EvictionCoordinator>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RetrievalProxy {
    pub fn new(
        store: Arc<dyn CacheStore>,
        remote: Arc<dyn RemoteStore>,
        eviction: Arc<EvictionCoordinator>,
    ) -> Self {
        Self {
            store,
            remote,
            eviction,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn retrieve(&self, token: &str) -> Result<Retrieved> {
        validate_key(token).map_err(|_| ProxyError::InvalidToken(token.to_string()))?;

        if self.store.exists(token).await {
            // An eviction pass may delete the file between the check and the
            // read; that surfaces as NotFound and a 500.
            let data = self.store.read(token).await?;
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(token, "Cache hit");
            return Ok(Retrieved {
                content_type: sniff_content_type(&data),
                data,
                from_cache: true,
            });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(token, "Cache miss, fetching from remote store");

        let data = self.remote.fetch(token).await.map_err(|e| {
            error!(token, error = %e, "Failed to fetch image from remote store");
            e
        })?;

        if let Err(e) = self.store.write(token, &data).await {
            if e.is_out_of_space() {
                warn!(token, error = %e, "Cache disk full, requesting eviction");
                self.eviction.request();
            }
            return Err(e.into());
        }

        Ok(Retrieved {
            content_type: sniff_content_type(&data),
            data,
            from_cache: false,
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
