//! Process-wide eviction coordination
//!
//! Eviction requests are published into a single-slot channel owned by a
//! background worker. The worker runs passes one after another, so while a
//! pass is active at most one follow-up can be queued and any further
//! requests are dropped. [`EvictionCoordinator::try_run_or_skip`] runs a pass
//! inline for callers that want to wait for it, and skips when one is
//! already running.

use crate::error::Result;
use crate::eviction::evict;
use crate::store::CacheStore;
use crate::types::EvictionReport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};

pub struct EvictionCoordinator {
    store: Arc<dyn CacheStore>,
    ceiling: u64,
    floor: u64,
    /// Held for the whole scan-and-delete sequence
    pass_lock: Mutex<()>,
    requests: mpsc::Sender<()>,
    completed: broadcast::Sender<EvictionReport>,
    passes: AtomicU64,
}

impl EvictionCoordinator {
    /// Create the coordinator and spawn its worker on the current tokio runtime.
    ///
    /// The worker exits once the last handle to the coordinator is dropped.
    pub fn spawn(store: Arc<dyn CacheStore>, ceiling: u64, floor: u64) -> Arc<Self> {
        let (requests, mut rx) = mpsc::channel(1);
        let (completed, _) = broadcast::channel(16);

        let coordinator = Arc::new(Self {
            store,
            ceiling,
            floor,
            pass_lock: Mutex::new(()),
            requests,
            completed,
            passes: AtomicU64::new(0),
        });

        let weak: Weak<Self> = Arc::downgrade(&coordinator);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let Some(coordinator) = weak.upgrade() else {
                    break;
                };
                let _guard = coordinator.pass_lock.lock().await;
                let _ = coordinator.execute().await;
            }
            debug!("Eviction worker stopped");
        });

        info!(ceiling, floor, "Eviction coordinator started");
        coordinator
    }

    /// Ask for an eviction pass without waiting for it.
    ///
    /// Returns false when the request collapsed into one already pending.
    pub fn request(&self) -> bool {
        match self.requests.try_send(()) {
            Ok(()) => {
                info!("Eviction pass requested");
                true
            }
            Err(TrySendError::Full(())) => {
                debug!("Eviction pass already pending, request dropped");
                false
            }
            Err(TrySendError::Closed(())) => {
                warn!("Eviction worker is not running, request dropped");
                false
            }
        }
    }

    /// Run a pass now unless one is already in progress.
    pub async fn try_run_or_skip(&self) -> Option<Result<EvictionReport>> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            debug!("Eviction pass already running, skipping");
            return None;
        };
        Some(self.execute().await)
    }

    /// Receive a report for every pass that completes after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EvictionReport> {
        self.completed.subscribe()
    }

    /// Number of passes run so far, failed scans included
    pub fn passes_completed(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    // Callers must hold `pass_lock`.
    async fn execute(&self) -> Result<EvictionReport> {
        let result = evict(self.store.as_ref(), self.ceiling, self.floor).await;
        self.passes.fetch_add(1, Ordering::Release);

        match &result {
            Ok(report) => {
                // No subscribers is fine.
                let _ = self.completed.send(report.clone());
            }
            Err(e) => error!(error = %e, "Eviction pass failed"),
        }
        result
    }
}
