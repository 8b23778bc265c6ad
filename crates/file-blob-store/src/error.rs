//! Error types for the blob store

use std::fmt;

#[derive(Debug)]
pub enum BlobStoreError {
    Io(Box<std::io::Error>),
    /// Name would escape the store directory or is empty
    InvalidName(String),
}

impl fmt::Display for BlobStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobStoreError::Io(err) => write!(f, "IO error: {}", err),
            BlobStoreError::InvalidName(name) => write!(f, "Invalid blob name: {:?}", name),
        }
    }
}

impl std::error::Error for BlobStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlobStoreError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BlobStoreError {
    fn from(err: std::io::Error) -> Self {
        BlobStoreError::Io(Box::new(err))
    }
}

impl From<tempfile::PersistError> for BlobStoreError {
    fn from(err: tempfile::PersistError) -> Self {
        BlobStoreError::Io(Box::new(err.error))
    }
}

pub type Result<T> = std::result::Result<T, BlobStoreError>;
