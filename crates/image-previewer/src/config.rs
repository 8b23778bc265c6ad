//! Configuration read from environment variables

use origin_fetcher::DEFAULT_MAX_BODY_BYTES;
use std::env;
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_CACHE_CAPACITY: usize = 3;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Entries kept by the cache index, at least 1
    pub cache_capacity: usize,
    pub storage_dir: PathBuf,
    pub max_body_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            storage_dir: PathBuf::from("./storage"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from any variable source. Unparseable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = lookup("PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let cache_capacity = match lookup("CACHE_CAPACITY").map(|c| c.trim().parse::<i64>()) {
            Some(Ok(capacity)) => usize::try_from(capacity.max(1)).unwrap_or(usize::MAX),
            Some(Err(e)) => {
                warn!(
                    error = %e,
                    default = defaults.cache_capacity,
                    "Invalid CACHE_CAPACITY, using default"
                );
                defaults.cache_capacity
            }
            None => defaults.cache_capacity,
        };

        let storage_dir = lookup("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);

        let max_body_bytes = lookup("MAX_BODY_BYTES")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&limit| limit > 0)
            .unwrap_or(defaults.max_body_bytes);

        Self {
            host,
            port,
            cache_capacity,
            storage_dir,
            max_body_bytes,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
