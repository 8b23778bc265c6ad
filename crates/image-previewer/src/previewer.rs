//! Fill pipeline: cache lookup, origin fetch, resize, persist, index update

use crate::error::{PreviewError, Result};
use crate::request::FillRequest;
use crate::transform::transform;
use axum::http::HeaderMap;
use file_blob_store::BlobStore;
use lru_index::CacheIndex;
use origin_fetcher::OriginFetcher;
use tracing::{debug, error, info, warn};

/// Where a fill result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Origin,
}

impl ServedFrom {
    /// Value of the `X-Cache` response header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ServedFrom::Cache => "HIT",
            ServedFrom::Origin => "MISS",
        }
    }
}

/// A resized JPEG ready to be served
#[derive(Debug)]
pub struct Filled {
    pub bytes: Vec<u8>,
    pub served_from: ServedFrom,
}

/// Owns the cache index, the blob store and the origin fetcher.
///
/// Concurrent misses for the same key are not deduplicated: each one fetches,
/// resizes and persists on its own, and the last write wins.
///
/// Blob names only carry the box and the source basename, so two sources
/// sharing a basename (`a/cat.jpg`, `b/cat.jpg`) overwrite one blob at the
/// same size. Both keys then point at whichever was written last.
pub struct Previewer {
    index: CacheIndex,
    store: BlobStore,
    fetcher: OriginFetcher,
}

impl Previewer {
    pub fn new(index: CacheIndex, store: BlobStore, fetcher: OriginFetcher) -> Self {
        Self {
            index,
            store,
            fetcher,
        }
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// Serve `request` from the cache, or fetch, resize and cache it.
    ///
    /// Fetch and transform failures leave the index and the disk untouched.
    /// A failed write to disk is logged and the image is still returned,
    /// just not cached.
    pub async fn fill(&self, request: &FillRequest, headers: &HeaderMap) -> Result<Filled> {
        if let Some(bytes) = self.lookup_cached(request).await {
            info!(key = %request.cache_key(), "Cache hit");
            return Ok(Filled {
                bytes,
                served_from: ServedFrom::Cache,
            });
        }

        info!(key = %request.cache_key(), "Cache miss");
        let bytes = self.fill_from_origin(request, headers).await?;

        match self.store.write(request.blob_name(), &bytes).await {
            Ok(()) => {
                self.index.set(request.cache_key(), request.blob_name());
                debug!(key = %request.cache_key(), name = %request.blob_name(), "Cached resized image");
            }
            Err(e) => {
                error!(
                    name = %request.blob_name(),
                    error = %e,
                    "Failed to persist resized image, serving it uncached"
                );
            }
        }

        Ok(Filled {
            bytes,
            served_from: ServedFrom::Origin,
        })
    }

    /// Indexed blob bytes, or `None` when the key is unknown or its blob is
    /// gone from disk.
    async fn lookup_cached(&self, request: &FillRequest) -> Option<Vec<u8>> {
        let name = self.index.get(request.cache_key())?;

        match self.store.read(&name).await {
            Ok(Some(bytes)) => Some(bytes),
            Ok(None) => {
                warn!(key = %request.cache_key(), name = %name, "Indexed blob missing on disk, refetching");
                None
            }
            Err(e) => {
                warn!(key = %request.cache_key(), name = %name, error = %e, "Failed to read indexed blob, refetching");
                None
            }
        }
    }

    async fn fill_from_origin(&self, request: &FillRequest, headers: &HeaderMap) -> Result<Vec<u8>> {
        let raw = self
            .fetcher
            .fetch(request.source(), headers)
            .await
            .map_err(|e| {
                error!(source = %request.source(), error = %e, "Failed to fetch source image");
                PreviewError::from(e)
            })?;

        let (width, height) = (request.width(), request.height());
        let encoded = tokio::task::spawn_blocking(move || transform(&raw, width, height))
            .await
            .map_err(|e| PreviewError::Internal(format!("transform task failed: {}", e)))?
            .map_err(|e| {
                warn!(source = %request.source(), error = %e, "Failed to transform source image");
                PreviewError::from(e)
            })?;

        Ok(encoded)
    }

    /// Forget every index entry and delete the blob directory
    pub async fn shutdown(&self) -> Result<()> {
        self.index.clear();
        self.store.purge().await?;
        Ok(())
    }
}
