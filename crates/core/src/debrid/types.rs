//! Types for debrid service operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error codes the service uses for throttling and download quotas.
pub const RATE_LIMIT_CODES: &[i64] = &[21, 34];

/// Errors that can occur during debrid operations.
#[derive(Debug, Error)]
pub enum DebridError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error (HTTP {status}{}): {message}", .code.map(|c| format!(", code {}", c)).unwrap_or_default())]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Request timeout")]
    Timeout,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl DebridError {
    /// Map a reqwest error onto the transport taxonomy.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DebridError::Timeout
        } else if e.is_connect() {
            DebridError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            DebridError::Decode(e.to_string())
        } else {
            DebridError::Api {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                code: None,
                message: e.to_string(),
            }
        }
    }

    /// Throttling or "too many active downloads".
    pub fn is_rate_limit_or_quota(&self) -> bool {
        match self {
            DebridError::Api { status, code, .. } => {
                *status == 429 || code.is_some_and(|c| RATE_LIMIT_CODES.contains(&c))
            }
            _ => false,
        }
    }

    /// Timeouts and connection failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, DebridError::Timeout | DebridError::ConnectionFailed(_))
    }

    /// Service error code, if the response carried one.
    pub fn code(&self) -> Option<i64> {
        match self {
            DebridError::Api { code, .. } => *code,
            _ => None,
        }
    }
}

/// Authenticated account details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    /// Remaining premium time in seconds.
    #[serde(default)]
    pub premium: i64,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
}

impl UserInfo {
    pub fn premium_days(&self) -> i64 {
        self.premium / 86_400
    }
}

/// Result of submitting a magnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMagnetResult {
    pub id: String,
    #[serde(default)]
    pub uri: Option<String>,
}

/// One file inside a remote torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: u64,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub selected: u8,
}

/// Remote torrent with its file list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentDetails {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// Remote torrent as listed by `GET /torrents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentSummary {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub status: String,
}

/// Statuses that occupy a download slot on the service.
pub const ACTIVE_STATUSES: &[&str] = &[
    "magnet_conversion",
    "waiting_files_selection",
    "queued",
    "downloading",
    "compressing",
    "uploading",
];

impl TorrentSummary {
    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(&self.status.as_str())
    }
}

/// A cached file reported by instant availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
    pub filename: String,
    pub filesize: u64,
}

/// An instantly available variant that contains at least one video file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedVariant {
    pub variant_id: String,
    pub video_files: Vec<CachedFile>,
    pub total_files: usize,
}

/// Cached variants by lowercase info hash. Hashes without a usable
/// variant are absent.
pub type Availability = HashMap<String, Vec<CachedVariant>>;

/// Trait for debrid service backends.
#[async_trait]
pub trait DebridClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Authenticated probe (`GET /user`).
    async fn user(&self) -> Result<UserInfo, DebridError>;

    /// Submit a magnet URI.
    async fn add_magnet(&self, magnet: &str) -> Result<AddMagnetResult, DebridError>;

    /// Fetch a remote torrent with its files.
    async fn torrent_info(&self, id: &str) -> Result<TorrentDetails, DebridError>;

    /// Mark files of a remote torrent for download.
    async fn select_files(&self, id: &str, file_ids: &[u64]) -> Result<(), DebridError>;

    /// Instant availability for a batch of info hashes.
    async fn instant_availability(&self, hashes: &[String]) -> Result<Availability, DebridError>;

    /// Remote torrents on the account.
    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, DebridError>;
}
