//! Types for CSV export.

use std::path::PathBuf;
use thiserror::Error;

/// Column headers, in order.
pub const CSV_HEADERS: [&str; 10] = [
    "YTS ID",
    "IMDb ID",
    "Movie Title",
    "Year",
    "Language",
    "Rating",
    "Quality",
    "YTS URL",
    "IMDb URL",
    "Torrent URL",
];

/// Prefix for the IMDb URL column.
pub const IMDB_TITLE_URL: &str = "https://www.imdb.com/title/";

/// Errors from CSV export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write CSV file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
