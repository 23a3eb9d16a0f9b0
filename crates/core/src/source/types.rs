//! Types for the movie listing source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Listing filter sent with every page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Quality filter ("all", "720p", "1080p", "2160p", "3D").
    pub quality: String,
    /// Genre filter ("all" for every genre).
    pub genre: String,
    /// Minimum IMDb rating (0-9).
    pub minimum_rating: u8,
    /// API sort field (e.g., "date_added", "rating").
    pub sort_by: String,
    /// "asc" or "desc".
    pub order_by: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            quality: "all".to_string(),
            genre: "all".to_string(),
            minimum_rating: 0,
            sort_by: "date_added".to_string(),
            order_by: "desc".to_string(),
        }
    }
}

/// One movie listing with its torrent variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    /// Stable release identifier from the listing source.
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// Title with year, e.g. "Heat (1995)".
    #[serde(default)]
    pub title_long: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub rating: f32,
    pub genres: Option<Vec<String>>,
    pub language: Option<String>,
    /// Listing page on the source site.
    pub url: Option<String>,
    pub imdb_code: Option<String>,
    pub large_cover_image: Option<String>,
    pub torrents: Option<Vec<TorrentVariant>>,
}

impl Movie {
    /// Release id as used for cache keys.
    pub fn release_id(&self) -> String {
        self.id.to_string()
    }

    /// Long title, falling back to "title (year)" when the source omits it.
    pub fn long_title(&self) -> String {
        if self.title_long.is_empty() {
            format!("{} ({})", self.title, self.year)
        } else {
            self.title_long.clone()
        }
    }
}

/// A single downloadable variant of a movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentVariant {
    /// Quality label ("720p", "1080p", "2160p", "3D").
    pub quality: String,
    /// .torrent download URL.
    pub url: Option<String>,
    /// Info hash (hex).
    pub hash: String,
}

/// Errors that can occur while talking to the listing source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status} from listing source")]
    Http { status: u16 },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl SourceError {
    /// Map a reqwest error onto the transport taxonomy.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_connect() {
            SourceError::ConnectionFailed(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::Http {
                status: status.as_u16(),
            }
        } else {
            SourceError::Request(e.to_string())
        }
    }
}

/// Trait for paginated movie listing backends.
#[async_trait]
pub trait MovieSource: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Total number of releases matching the query.
    ///
    /// A response that cannot be decoded counts as zero.
    async fn movie_count(&self, query: &ListQuery) -> Result<u64, SourceError>;

    /// Releases on one page. Empty when the page has none or cannot be decoded.
    async fn fetch_page(&self, query: &ListQuery, page: u32) -> Result<Vec<Movie>, SourceError>;

    /// Download a cover image.
    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}
