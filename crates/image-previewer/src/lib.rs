//! JPEG Previewer
//!
//! Fetches a source JPEG from its origin, fits it into a requested bounding
//! box and serves the result, keeping resized images in an LRU-indexed
//! on-disk cache.

pub mod config;
pub mod error;
pub mod previewer;
pub mod request;
pub mod server;
pub mod transform;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{ErrorCategory, PreviewError, Result, TransformError};
pub use previewer::{Filled, Previewer, ServedFrom};
pub use request::FillRequest;
pub use server::{create_router, start_server, ServerState, SharedState};
