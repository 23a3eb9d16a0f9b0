//! Persistent cross-run cache of processed releases.
//!
//! The cache remembers which (release, quality) pairs have already been turned
//! into descriptors so that scheduled runs skip them without touching the
//! output directory. Entries that have not been seen for longer than the
//! retention window are dropped when the cache is loaded.

mod config;
mod store;
mod types;

pub use config::CacheConfig;
pub use store::PersistentCache;
pub use types::{CacheError, ReleaseCacheEntry};
