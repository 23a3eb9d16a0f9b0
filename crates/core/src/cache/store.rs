//! JSON-file backed release cache.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::types::{CacheError, ReleaseCacheEntry};

/// Disk-backed map from release id to processing history.
///
/// Read once at the start of a run and written once at the end. Concurrent
/// runs against the same file are not supported.
#[derive(Debug)]
pub struct PersistentCache {
    path: PathBuf,
    entries: BTreeMap<String, ReleaseCacheEntry>,
}

impl PersistentCache {
    /// Create an empty cache that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache, dropping entries not seen within `retention`.
    ///
    /// Never fails: a missing or unreadable file yields an empty cache.
    pub async fn load(path: impl Into<PathBuf>, retention: Duration) -> Self {
        Self::load_at(path, retention, Utc::now()).await
    }

    /// Same as [`load`](Self::load) with an explicit clock.
    pub async fn load_at(path: impl Into<PathBuf>, retention: Duration, now: DateTime<Utc>) -> Self {
        let path = path.into();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            info!(path = %path.display(), "No release cache yet, starting empty");
            return Self::empty(path);
        }

        match read_entries(&path).await {
            Ok(raw) => {
                let cutoff = now - retention;
                let total = raw.len();
                let entries: BTreeMap<_, _> = raw
                    .into_iter()
                    .filter(|(_, entry)| entry.last_seen > cutoff)
                    .collect();
                info!(
                    path = %path.display(),
                    loaded = entries.len(),
                    expired = total - entries.len(),
                    "Loaded release cache"
                );
                Self { path, entries }
            }
            Err(e) => {
                warn!(error = %e, "Could not load release cache, starting empty");
                Self::empty(path)
            }
        }
    }

    /// File this cache is saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ReleaseCacheEntry> {
        self.entries.get(id)
    }

    /// Iterate over all release ids in the cache.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether the (release, quality) pair was already processed.
    pub fn contains(&self, id: &str, quality: &str) -> bool {
        self.entries
            .get(id)
            .map(|entry| entry.has_quality(quality))
            .unwrap_or(false)
    }

    /// Record a processed (release, quality) pair.
    pub fn record(&mut self, id: &str, name: &str, year: u32, quality: &str) {
        self.record_at(id, name, year, quality, Utc::now());
    }

    /// Same as [`record`](Self::record) with an explicit clock.
    pub fn record_at(&mut self, id: &str, name: &str, year: u32, quality: &str, now: DateTime<Utc>) {
        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| ReleaseCacheEntry::new(name, year, now));
        if entry.touch(quality, now) {
            debug!(id, quality, "Recorded release quality in cache");
        }
    }

    /// Serialize the whole map back to disk.
    ///
    /// Writes to a sibling temp file first and renames it into place.
    pub async fn save(&self) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(&self.entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| CacheError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|source| CacheError::Write {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| CacheError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "Saved release cache"
        );
        Ok(())
    }
}

/// Read the raw entry map. Malformed individual entries are skipped.
async fn read_entries(path: &Path) -> Result<BTreeMap<String, ReleaseCacheEntry>, CacheError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&content).map_err(|source| CacheError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut entries = BTreeMap::new();
    for (id, value) in raw {
        match serde_json::from_value::<ReleaseCacheEntry>(value) {
            Ok(entry) => {
                entries.insert(id, entry);
            }
            Err(e) => debug!(id = %id, error = %e, "Skipping malformed cache entry"),
        }
    }
    Ok(entries)
}
