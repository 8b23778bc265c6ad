//! Flat on-disk blob store
//!
//! Stores encoded image bytes in a single directory keyed by a derived
//! filename. Writes go through a temporary file that is renamed into place,
//! so readers only ever see complete blobs.

mod error;
mod store;

pub use error::{BlobStoreError, Result};
pub use store::BlobStore;
