//! Directory scan for pending descriptors.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::persister::DESCRIPTOR_EXT;

use super::{MagnetDescriptor, QueueError, QueuedDescriptor};

/// A directory tree of descriptor files.
#[derive(Debug, Clone)]
pub struct DescriptorQueue {
    root: PathBuf,
}

impl DescriptorQueue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every descriptor under the root, newest first (ties broken by path).
    pub async fn scan(&self) -> Result<Vec<QueuedDescriptor>, QueueError> {
        let root = self.root.clone();
        if !tokio::fs::try_exists(&root).await.unwrap_or(false) {
            return Err(QueueError::DirectoryNotFound(root));
        }

        let mut found = tokio::task::spawn_blocking(move || scan_tree(&root))
            .await
            .map_err(|e| QueueError::Scan(e.to_string()))?;

        found.sort_by(|a, b| {
            Reverse(a.modified)
                .cmp(&Reverse(b.modified))
                .then_with(|| a.path.cmp(&b.path))
        });

        debug!(root = %self.root.display(), count = found.len(), "Scanned descriptor queue");
        Ok(found)
    }

    /// Read and decode one descriptor.
    pub async fn load(&self, entry: &QueuedDescriptor) -> Result<MagnetDescriptor, QueueError> {
        let content = tokio::fs::read_to_string(&entry.path)
            .await
            .map_err(|source| QueueError::Read {
                path: entry.path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| QueueError::Parse {
            path: entry.path.clone(),
            source,
        })
    }
}

fn scan_tree(root: &Path) -> Vec<QueuedDescriptor> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable queue entry");
                continue;
            }
        };
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|e| e.to_str()) != Some(DESCRIPTOR_EXT)
        {
            continue;
        }
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        found.push(QueuedDescriptor {
            path: entry.into_path(),
            modified,
        });
    }
    found
}
