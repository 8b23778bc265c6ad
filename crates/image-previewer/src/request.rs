//! Fill request parsing
//!
//! Grammar of the fill path (everything after `/fill/`):
//!
//! ```text
//! {width}/{height}/{host[:port]}/{path...}
//! ```
//!
//! The source has no scheme; the fetcher picks one. The cache key is
//! `{width}/{height}/{source}` and the stored blob is named
//! `{width}x{height}_{basename}`, where the basename is the last path segment.

use crate::error::{PreviewError, Result};
use url::Url;

/// A validated fill request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRequest {
    width: u32,
    height: u32,
    source: String,
    cache_key: String,
    blob_name: String,
}

impl FillRequest {
    /// Parse `{width}/{height}/{source}`
    pub fn parse(params: &str) -> Result<Self> {
        let mut parts = params.trim_start_matches('/').splitn(3, '/');
        let (Some(width), Some(height), Some(source)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(PreviewError::Parameter("not enough params".to_string()));
        };

        let width = parse_dimension("width", width)?;
        let height = parse_dimension("height", height)?;
        Self::new(width, height, source)
    }

    pub fn new(width: u32, height: u32, source: &str) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(PreviewError::Parameter(
                "width or height less than 1".to_string(),
            ));
        }

        let source = source.trim_start_matches('/');
        let Some((host, path)) = source.split_once('/') else {
            return Err(PreviewError::Parameter(format!(
                "source {:?} has no path",
                source
            )));
        };
        if host.is_empty() || path.is_empty() {
            return Err(PreviewError::Parameter(format!(
                "source {:?} needs a host and a path",
                source
            )));
        }

        Url::parse(&format!("http://{}", source))
            .map_err(|e| PreviewError::Parameter(format!("invalid source {:?}: {}", source, e)))?;

        let basename = source.rsplit('/').next().unwrap_or_default();
        if basename.is_empty() || basename == "." || basename == ".." {
            return Err(PreviewError::Parameter(format!(
                "source {:?} has no file name",
                source
            )));
        }

        Ok(Self {
            width,
            height,
            source: source.to_string(),
            cache_key: format!("{}/{}/{}", width, height, source),
            blob_name: format!("{}x{}_{}", width, height, basename),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Origin location without scheme
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }
}

fn parse_dimension(label: &str, raw: &str) -> Result<u32> {
    raw.parse::<u32>()
        .map_err(|e| PreviewError::Parameter(format!("wrong {} data: {}", label, e)))
}
