//! Append-only CSV writer.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::filter::Candidate;

use super::{ExportError, CSV_HEADERS, IMDB_TITLE_URL};

/// Appends one row per accepted candidate. Every field is quoted; the header
/// is written only when the file does not exist yet.
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append rows for `candidates`. Returns the number of rows written.
    pub async fn append(&self, candidates: &[Candidate]) -> Result<usize, ExportError> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let is_new = !tokio::fs::try_exists(&self.path).await.unwrap_or(false);
        let mut out = String::new();
        if is_new {
            push_row(&mut out, CSV_HEADERS.iter().map(|h| h.to_string()));
        }
        for candidate in candidates {
            push_row(&mut out, row(candidate).into_iter());
        }

        let err = |source| ExportError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await.map_err(err)?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(err)?;
        file.write_all(out.as_bytes()).await.map_err(err)?;
        file.flush().await.map_err(err)?;

        debug!(path = %self.path.display(), rows = candidates.len(), "Appended CSV rows");
        Ok(candidates.len())
    }
}

fn row(c: &Candidate) -> Vec<String> {
    let imdb = c.imdb_code.clone().unwrap_or_default();
    let imdb_url = if imdb.is_empty() {
        String::new()
    } else {
        format!("{}{}", IMDB_TITLE_URL, imdb)
    };
    vec![
        c.release_id.clone(),
        imdb,
        c.title.clone(),
        c.year.to_string(),
        c.language.clone().unwrap_or_default(),
        c.rating.to_string(),
        c.quality.clone(),
        c.url.clone().unwrap_or_default(),
        imdb_url,
        c.torrent_url.clone().unwrap_or_default(),
    ]
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let quoted: Vec<String> = fields
        .map(|f| format!("\"{}\"", f.replace('"', "\"\"")))
        .collect();
    out.push_str(&quoted.join(","));
    out.push('\n');
}
