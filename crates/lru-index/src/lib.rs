//! Fixed-capacity LRU index
//!
//! Maps a request signature (cache key) to the filename of a stored artifact.
//! Ordering is kept in an arena of nodes addressed by integer handles, so every
//! operation is O(1) and no node is ever shared outside the index.

mod index;
mod types;

pub use index::CacheIndex;
pub use types::IndexStats;
