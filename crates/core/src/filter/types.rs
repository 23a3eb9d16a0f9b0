//! Types for release filtering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder genre used when a release lists none.
pub const NO_GENRE: &str = "None";

/// How accepted releases are fanned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorizeBy {
    /// One output per accepted variant.
    #[default]
    None,
    /// One output per (variant, genre).
    Genre,
}

/// Filter settings derived from the scraper configuration.
#[derive(Debug, Clone)]
pub struct FilterSettings {
    /// Quality to accept, or "all".
    pub quality: String,
    /// Releases older than this year are rejected.
    pub year_limit: u32,
    pub categorize_by: CategorizeBy,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            quality: "all".to_string(),
            year_limit: 0,
            categorize_by: CategorizeBy::None,
        }
    }
}

/// Why a release or variant was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    BelowYearFloor { year: u32, floor: u32 },
    SeenThisRun,
    NoTorrents,
    QualityMismatch { quality: String },
    AlreadyCached { quality: String },
}

impl Rejection {
    /// Short label used for metrics and summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::BelowYearFloor { .. } => "year_floor",
            Rejection::SeenThisRun => "seen_this_run",
            Rejection::NoTorrents => "no_torrents",
            Rejection::QualityMismatch { .. } => "quality_mismatch",
            Rejection::AlreadyCached { .. } => "already_cached",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::BelowYearFloor { year, floor } => {
                write!(f, "year {} is below the floor {}", year, floor)
            }
            Rejection::SeenThisRun => write!(f, "already handled in this run"),
            Rejection::NoTorrents => write!(f, "no torrents available"),
            Rejection::QualityMismatch { quality } => {
                write!(f, "quality {} does not match the filter", quality)
            }
            Rejection::AlreadyCached { quality } => write!(f, "{} already processed", quality),
        }
    }
}

/// An accepted (release, variant[, genre]) ready for persistence.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub release_id: String,
    /// Short title, as listed.
    pub title: String,
    /// Long title with filesystem-illegal characters removed.
    pub display_name: String,
    pub year: u32,
    pub quality: String,
    /// Torrent info hash.
    pub hash: String,
    pub torrent_url: Option<String>,
    pub imdb_code: Option<String>,
    /// Set only when categorizing by genre.
    pub genre: Option<String>,
    pub cover_url: Option<String>,
    pub rating: f32,
    pub language: Option<String>,
    /// Listing page on the source site.
    pub url: Option<String>,
}

/// Result of filtering one release.
#[derive(Debug, Default)]
pub struct Evaluation {
    pub accepted: Vec<Candidate>,
    pub rejections: Vec<Rejection>,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_by_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            categorize_by: CategorizeBy,
        }
        let w: Wrapper = toml::from_str(r#"categorize_by = "genre""#).unwrap();
        assert_eq!(w.categorize_by, CategorizeBy::Genre);
        let w: Wrapper = toml::from_str(r#"categorize_by = "none""#).unwrap();
        assert_eq!(w.categorize_by, CategorizeBy::None);
    }

    #[test]
    fn test_rejection_reason_labels() {
        assert_eq!(Rejection::SeenThisRun.reason(), "seen_this_run");
        assert_eq!(
            Rejection::BelowYearFloor {
                year: 1999,
                floor: 2000
            }
            .reason(),
            "year_floor"
        );
        assert_eq!(
            Rejection::AlreadyCached {
                quality: "1080p".into()
            }
            .to_string(),
            "1080p already processed"
        );
    }
}
