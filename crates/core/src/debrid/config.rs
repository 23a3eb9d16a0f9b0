//! Debrid client configuration.

use std::time::Duration;

/// Connection settings for [`super::RealDebridClient`].
#[derive(Debug, Clone)]
pub struct DebridConfig {
    pub api_key: String,
    /// REST base URL, e.g. "https://api.real-debrid.com/rest/1.0".
    pub base_url: String,
    /// Minimum gap between two requests.
    pub request_interval: Duration,
    pub timeout: Duration,
}
