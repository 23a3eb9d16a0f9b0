//! Types for descriptor persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Where and how descriptors are written.
#[derive(Debug, Clone)]
pub struct PersisterSettings {
    /// Root directory for descriptor folders.
    pub output_dir: PathBuf,
    /// Also write a `<stem>.jpg` cover next to each new descriptor.
    pub posters: bool,
    /// Append the IMDb id to descriptor file names.
    pub append_imdb_id: bool,
}

/// Result of a single write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    AlreadyExists(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            WriteOutcome::Written(p) | WriteOutcome::AlreadyExists(p) => p,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written(_))
    }
}

/// Errors from writing descriptors.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write descriptor {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_json::Error),
}
