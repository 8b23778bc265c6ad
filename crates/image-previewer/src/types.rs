//! Response types for the previewer's HTTP surface

use lru_index::IndexStats;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: IndexStats,
}
