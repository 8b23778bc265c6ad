//! Origin fetcher
//!
//! Downloads source JPEGs from an origin server. Prefers https and falls back
//! to plain http once on transport failure, forwards the caller's headers, and
//! refuses bodies that are not JPEG or that grow past a byte ceiling.

pub mod error;
pub mod fetcher;

pub use error::{FetchError, Result};
pub use fetcher::{OriginFetcher, DEFAULT_MAX_BODY_BYTES, JPEG_CONTENT_TYPE};
