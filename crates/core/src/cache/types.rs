//! Types for the release cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Processing history for one release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseCacheEntry {
    /// Display name at the time the release was first accepted.
    pub name: String,
    /// Release year.
    pub year: u32,
    /// Quality labels already turned into descriptors. Only ever grows.
    #[serde(default)]
    pub qualities: Vec<String>,
    /// When the release was first recorded.
    pub first_seen: DateTime<Utc>,
    /// When the release was last recorded.
    pub last_seen: DateTime<Utc>,
}

impl ReleaseCacheEntry {
    /// Create a fresh entry seen for the first time at `now`.
    pub fn new(name: impl Into<String>, year: u32, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            year,
            qualities: Vec::new(),
            first_seen: now,
            last_seen: now,
        }
    }

    /// Whether the given quality was already processed.
    pub fn has_quality(&self, quality: &str) -> bool {
        self.qualities.iter().any(|q| q == quality)
    }

    /// Bump last-seen and append the quality if it is new.
    ///
    /// Returns `true` if the quality was added.
    pub fn touch(&mut self, quality: &str, now: DateTime<Utc>) -> bool {
        if now > self.last_seen {
            self.last_seen = now;
        }
        if self.has_quality(quality) {
            false
        } else {
            self.qualities.push(quality.to_string());
            true
        }
    }
}

/// Errors from cache persistence.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse cache file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
