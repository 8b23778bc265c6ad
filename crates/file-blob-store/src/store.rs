//! Directory-backed blob storage

use crate::error::{BlobStoreError, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Prefix for in-flight temporary files. Never a valid blob name.
const TEMP_PREFIX: &str = ".tmp-";

/// A flat directory of blobs addressed by filename
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// Directory where blobs are stored. Created on first write.
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a blob name to its path inside the store directory
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.starts_with(TEMP_PREFIX)
            || name.contains(['/', '\\', '\0'])
        {
            return Err(BlobStoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    /// Write `data` under `name`, replacing any existing blob.
    ///
    /// The directory is created if it does not exist yet. Bytes land in a
    /// temporary file first and are renamed over the final name, so a
    /// dropped future never leaves a truncated blob behind.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir).await?;

        let dir = self.dir.clone();
        let data = data.to_vec();
        let size = data.len();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut temp = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .tempfile_in(&dir)?;
            temp.write_all(&data)?;
            temp.as_file().sync_all()?;
            temp.persist(&path)?;
            Ok(())
        })
        .await
        .map_err(|e| BlobStoreError::from(io::Error::other(e)))??;

        debug!(name, size, "Stored blob");
        Ok(())
    }

    /// Read the blob stored under `name`, or `None` if it is absent
    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the whole store directory. A missing directory is not an error.
    pub async fn purge(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!(dir = ?self.dir, "Removed blob directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
