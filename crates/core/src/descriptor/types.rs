//! Descriptor record format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

use crate::persister::magnet_uri;

/// One accepted (release, quality) pair, as stored on disk.
///
/// The JSON keys are read by separate, later processes and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetDescriptor {
    pub magnet_link: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub movie_name: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub movie_id: String,
    /// ISO 8601 creation time.
    #[serde(default)]
    pub created_at: String,
}

impl MagnetDescriptor {
    /// Build a descriptor for a new write, stamping `created_at` with now.
    pub fn new(
        hash: &str,
        movie_name: &str,
        year: u32,
        quality: &str,
        imdb_id: Option<String>,
        movie_id: &str,
    ) -> Self {
        Self {
            magnet_link: magnet_uri(hash, movie_name),
            hash: hash.to_string(),
            movie_name: movie_name.to_string(),
            year,
            quality: quality.to_string(),
            imdb_id,
            movie_id: movie_id.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Lowercase info hash, taken from `hash` or parsed from the magnet link.
    pub fn info_hash(&self) -> Option<String> {
        let hash = if self.hash.is_empty() {
            crate::persister::hash_from_magnet(&self.magnet_link)?
        } else {
            self.hash.as_str()
        };
        Some(hash.to_lowercase())
    }
}

/// A descriptor file found by a queue scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedDescriptor {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Errors from scanning or reading descriptors.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Descriptor directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read descriptor {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse descriptor {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Descriptor scan failed: {0}")]
    Scan(String),
}
