//! r2img proxy - WebP-normalizing upload proxy with a disk-cached read path

use blob_store_client::{BlobStoreClient, RemoteStore};
use disk_blob_cache::{CacheStore, DiskCache, EvictionCoordinator};
use r2img_proxy::codec::WebpCodec;
use r2img_proxy::ingest::IngestPipeline;
use r2img_proxy::retrieval::RetrievalProxy;
use r2img_proxy::server::{start_server, ServerState, SharedState};
use r2img_proxy::{Config, ProxyError, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("r2img_proxy=info".parse()?)
        .add_directive("disk_blob_cache=info".parse()?)
        .add_directive("blob_store_client=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting r2img proxy...");

    let config = Config::from_env()?;
    info!("Port: {}", config.port());
    info!("Remote store: {}", config.api_site);
    info!("Cache dir: {:?}", config.cache_dir);
    info!(
        "Cache ceiling: {} MB, floor: {} MB",
        config.max_cache_size, config.free_cache_size
    );
    info!("Max upload size: {} MB", config.max_file_size);

    let cache = DiskCache::new(config.cache_dir.clone());
    cache.init().await?;
    let store: Arc<dyn CacheStore> = Arc::new(cache);

    let remote: Arc<dyn RemoteStore> = Arc::new(BlobStoreClient::new(
        &config.api_site,
        &config.api_key,
    )?);

    let eviction = EvictionCoordinator::spawn(
        store.clone(),
        config.cache_ceiling_bytes(),
        config.cache_floor_bytes(),
    );

    // Bring an oversized cache back under budget without delaying startup.
    let housekeeping = eviction.clone();
    tokio::spawn(async move {
        match housekeeping.try_run_or_skip().await {
            Some(Ok(report)) => info!(
                freed = report.freed,
                deleted = report.deleted,
                "Startup eviction pass finished"
            ),
            Some(Err(e)) => warn!(error = %e, "Startup eviction pass failed"),
            None => {}
        }
    });

    let state: SharedState = Arc::new(ServerState::new(
        IngestPipeline::new(Arc::new(WebpCodec), remote.clone()),
        RetrievalProxy::new(store, remote, eviction),
        &config.auth_key,
        config.quality,
    ));

    // Start HTTP server (blocking)
    start_server(state, config.port(), config.max_file_bytes())
        .await
        .map_err(|e| ProxyError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
