//! Cache configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the persistent release cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Location of the JSON cache file.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Entries whose last-seen timestamp is older than this many days are
    /// dropped at load time.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_path() -> PathBuf {
    PathBuf::from("scraper_cache.json")
}

fn default_retention_days() -> u32 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            retention_days: default_retention_days(),
        }
    }
}

impl CacheConfig {
    /// Retention window as a chrono duration.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days as i64)
    }
}
