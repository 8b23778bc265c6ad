//! JPEG Previewer - resizing proxy with an LRU-indexed disk cache

use file_blob_store::BlobStore;
use image_previewer::{start_server, Config, PreviewError, Previewer, Result, ServerState, SharedState};
use lru_index::CacheIndex;
use origin_fetcher::OriginFetcher;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("image_previewer=info".parse()?);

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

    info!("Starting JPEG Previewer...");

    let config = Config::from_env();
    info!("Bind address: {}", config.bind_addr());

    let fetcher = OriginFetcher::with_max_body_bytes(config.max_body_bytes)?;
    info!(
        "Max source size: {} MB",
        fetcher.max_body_bytes() / (1024 * 1024)
    );

    let previewer = Previewer::new(
        CacheIndex::new(config.cache_capacity),
        BlobStore::new(&config.storage_dir),
        fetcher,
    );
    info!("Storage dir: {:?}", previewer.store().dir());
    info!("Cache capacity: {}", previewer.index().capacity());

    let state: SharedState = Arc::new(ServerState::new(previewer));

    // Blocks until a shutdown signal has drained the server
    let served = start_server(Arc::clone(&state), &config.bind_addr()).await;

    // Resized images are a rebuildable derivative of the origins
    if let Err(e) = state.previewer.shutdown().await {
        error!(error = %e, "Failed to remove blob directory");
    }

    served.map_err(|e| PreviewError::Config(format!("Server error: {}", e)))?;

    info!("Shut down cleanly");
    Ok(())
}
