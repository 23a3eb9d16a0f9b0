//! Types for scrape runs.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::source::SourceError;

/// Counters for a finished scrape run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeSummary {
    /// Matching releases, adjusted for the start page.
    pub total_movies: i64,
    pub pages_planned: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    /// Releases read from fetched pages.
    pub releases_seen: usize,
    /// Accepted (release, quality[, genre]) outputs.
    pub accepted: usize,
    pub written: usize,
    pub existing: usize,
    pub write_failed: usize,
    pub csv_rows: usize,
    /// Rejections keyed by reason label.
    pub rejected: BTreeMap<&'static str, usize>,
    /// The continue decider stopped the run.
    pub aborted: bool,
    /// Descriptor files under the output directory after the run.
    pub descriptors_on_disk: Option<usize>,
}

/// Errors that end a scrape run before any page is read.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Listing source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),
}
