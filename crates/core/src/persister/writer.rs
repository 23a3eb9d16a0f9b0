//! Descriptor and poster writes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::cache::PersistentCache;
use crate::descriptor::MagnetDescriptor;
use crate::filter::Candidate;
use crate::source::MovieSource;

use super::magnet::build_path;
use super::{PersistError, PersisterSettings, WriteOutcome};

/// Writes one descriptor per accepted candidate.
///
/// Safe to share across concurrent writes: an existing file is never
/// replaced, even when two writes race for the same path.
pub struct MagnetPersister {
    settings: PersisterSettings,
    covers: Option<Arc<dyn MovieSource>>,
}

impl MagnetPersister {
    pub fn new(settings: PersisterSettings) -> Self {
        Self {
            settings,
            covers: None,
        }
    }

    /// Source used to download cover images when posters are enabled.
    pub fn with_cover_source(mut self, source: Arc<dyn MovieSource>) -> Self {
        self.covers = Some(source);
        self
    }

    pub fn settings(&self) -> &PersisterSettings {
        &self.settings
    }

    /// Descriptor path for a candidate.
    pub fn path_for(&self, candidate: &Candidate) -> PathBuf {
        let external_id = if self.settings.append_imdb_id {
            candidate.imdb_code.as_deref()
        } else {
            None
        };
        build_path(
            &self.settings.output_dir,
            &candidate.display_name,
            candidate.year,
            &candidate.quality,
            external_id,
        )
    }

    /// Write the descriptor (and poster) unless a complete one already exists.
    ///
    /// The body goes to a sibling temp file first and is hard-linked into
    /// place, so the final path only ever holds a complete descriptor and a
    /// concurrent writer that got there first is never replaced. A file at
    /// the final path that does not parse is left over from an interrupted
    /// write and is replaced.
    pub async fn write(&self, candidate: &Candidate) -> Result<WriteOutcome, PersistError> {
        let path = self.path_for(candidate);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if is_complete(&path).await {
                debug!(path = %path.display(), "Descriptor already exists");
                return Ok(WriteOutcome::AlreadyExists(path));
            }
            warn!(path = %path.display(), "Replacing incomplete descriptor");
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(PersistError::Write {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| PersistError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let descriptor = MagnetDescriptor::new(
            &candidate.hash,
            &candidate.display_name,
            candidate.year,
            &candidate.quality,
            candidate.imdb_code.clone(),
            &candidate.release_id,
        );
        let body = serde_json::to_vec_pretty(&descriptor)?;

        let tmp = temp_path(&path);
        let linked = match write_new(&tmp, &body).await {
            Ok(()) => tokio::fs::hard_link(&tmp, &path).await,
            Err(e) => Err(e),
        };
        // Only the temp name is ours to clean up; the final path is never
        // touched on failure.
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(WriteOutcome::AlreadyExists(path));
            }
            Err(source) => return Err(PersistError::Write { path, source }),
        }

        if self.settings.posters {
            self.write_poster(candidate, &path).await;
        }

        info!(
            name = %candidate.display_name,
            quality = %candidate.quality,
            path = %path.display(),
            "Wrote magnet descriptor"
        );
        Ok(WriteOutcome::Written(path))
    }

    /// Write and record into the cache. Both outcomes are recorded so an
    /// existing descriptor re-confirms the cache entry.
    ///
    /// Returns true if a new descriptor was written.
    pub async fn persist(
        &self,
        candidate: &Candidate,
        cache: &mut PersistentCache,
    ) -> Result<bool, PersistError> {
        let outcome = self.write(candidate).await?;
        record(cache, candidate);
        Ok(outcome.is_written())
    }

    async fn write_poster(&self, candidate: &Candidate, descriptor_path: &Path) {
        let (Some(source), Some(url)) = (&self.covers, candidate.cover_url.as_deref()) else {
            return;
        };
        let poster_path = descriptor_path.with_extension("jpg");

        let bytes = match source.fetch_cover(url).await {
            Ok(b) => b,
            Err(e) => {
                warn!(url, error = %e, "Failed to download poster");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&poster_path, bytes).await {
            warn!(path = %poster_path.display(), error = %e, "Failed to write poster");
        }
    }
}

/// Sibling temp name, unique per write so concurrent writers and
/// leftovers from killed runs never collide.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{:08x}.tmp", rand::random::<u32>()));
    path.with_file_name(name)
}

async fn write_new(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Whether `path` holds a descriptor that parses.
async fn is_complete(path: &Path) -> bool {
    match tokio::fs::read(path).await {
        Ok(body) => serde_json::from_slice::<MagnetDescriptor>(&body).is_ok(),
        Err(_) => false,
    }
}

/// Record a candidate as processed.
pub(crate) fn record(cache: &mut PersistentCache, candidate: &Candidate) {
    cache.record(
        &candidate.release_id,
        &candidate.display_name,
        candidate.year,
        &candidate.quality,
    );
}
