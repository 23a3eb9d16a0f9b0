//! Listing source configuration.

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;

/// YTS listing API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YtsConfig {
    /// API base URL (e.g., "https://yts.mx/api/v2").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 15).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Retry policy for listing and poster requests.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "https://yts.mx/api/v2".to_string()
}

fn default_timeout() -> u32 {
    15
}

impl Default for YtsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            retry: RetryPolicy::default(),
        }
    }
}
