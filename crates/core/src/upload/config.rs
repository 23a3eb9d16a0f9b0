//! Upload configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::debrid::DebridConfig;

/// Configuration for the upload run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Debrid API token. Required by the upload command only.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Root of the descriptor tree.
    #[serde(default = "default_descriptor_dir")]
    pub descriptor_dir: PathBuf,

    /// Descriptors considered per run, newest first.
    #[serde(default = "default_max_per_run")]
    pub max_per_run: usize,

    /// Per-run cap when only instantly available descriptors are uploaded.
    #[serde(default = "default_max_cached_per_run")]
    pub max_cached_per_run: usize,

    /// Upload only descriptors the service reports as cached.
    #[serde(default)]
    pub cached_only: bool,

    /// Hashes per instant-availability request.
    #[serde(default = "default_batch_size")]
    pub cache_check_batch_size: usize,

    /// Minimum gap between two debrid requests (milliseconds).
    #[serde(default = "default_request_interval")]
    pub request_interval_ms: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,

    /// Active remote downloads at which uploads pause (0 = unlimited).
    #[serde(default)]
    pub max_active_downloads: usize,

    /// Wait between active-download polls (milliseconds).
    #[serde(default = "default_active_poll_interval")]
    pub active_poll_interval_ms: u64,

    /// Polls before the rest of the run is deferred.
    #[serde(default = "default_max_active_polls")]
    pub max_active_polls: u32,

    #[serde(default)]
    pub policy: UploadPolicy,
}

fn default_base_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}

fn default_descriptor_dir() -> PathBuf {
    PathBuf::from("Downloads/2160p_Movies")
}

fn default_max_per_run() -> usize {
    20
}

fn default_max_cached_per_run() -> usize {
    100
}

fn default_batch_size() -> usize {
    10
}

fn default_request_interval() -> u64 {
    3000
}

fn default_timeout() -> u32 {
    30
}

fn default_active_poll_interval() -> u64 {
    60_000
}

fn default_max_active_polls() -> u32 {
    5
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            descriptor_dir: default_descriptor_dir(),
            max_per_run: default_max_per_run(),
            max_cached_per_run: default_max_cached_per_run(),
            cached_only: false,
            cache_check_batch_size: default_batch_size(),
            request_interval_ms: default_request_interval(),
            timeout_secs: default_timeout(),
            max_active_downloads: 0,
            active_poll_interval_ms: default_active_poll_interval(),
            max_active_polls: default_max_active_polls(),
            policy: UploadPolicy::default(),
        }
    }
}

impl UploadConfig {
    /// Cap for this run, depending on the mode.
    pub fn run_limit(&self) -> usize {
        if self.cached_only {
            self.max_cached_per_run
        } else {
            self.max_per_run
        }
    }

    pub fn debrid_config(&self) -> DebridConfig {
        DebridConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            request_interval: Duration::from_millis(self.request_interval_ms),
            timeout: Duration::from_secs(self.timeout_secs as u64),
        }
    }
}

/// How the wait after a rate-limit response grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    /// `base * multiplier^min(n, max_exponent)`.
    #[default]
    Adaptive,
    /// Always `base`.
    Fixed,
}

/// Retry and early-termination policy for uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Attempts per descriptor, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base wait after a rate-limit or quota response (milliseconds).
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default)]
    pub backoff: BackoffMode,

    #[serde(default = "default_multiplier")]
    pub multiplier: u32,

    #[serde(default = "default_max_exponent")]
    pub max_exponent: u32,

    /// Consecutive rate-limited descriptors that end the run.
    #[serde(default = "default_rate_limit_halt")]
    pub rate_limit_halt_threshold: u32,

    /// Consecutive failed descriptors of any kind that end the run.
    #[serde(default = "default_failure_threshold")]
    pub consecutive_failure_threshold: u32,

    /// Wait before retrying after a timeout or connection error (milliseconds).
    #[serde(default = "default_transport_delay")]
    pub transport_retry_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    2
}

fn default_base_delay() -> u64 {
    30_000
}

fn default_multiplier() -> u32 {
    2
}

fn default_max_exponent() -> u32 {
    3
}

fn default_rate_limit_halt() -> u32 {
    3
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_transport_delay() -> u64 {
    10_000
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            backoff: BackoffMode::default(),
            multiplier: default_multiplier(),
            max_exponent: default_max_exponent(),
            rate_limit_halt_threshold: default_rate_limit_halt(),
            consecutive_failure_threshold: default_failure_threshold(),
            transport_retry_delay_ms: default_transport_delay(),
        }
    }
}

impl UploadPolicy {
    /// Wait after a rate-limit response, given how many came before it.
    pub fn backoff_delay(&self, consecutive: u32) -> Duration {
        let ms = match self.backoff {
            BackoffMode::Fixed => self.base_delay_ms,
            BackoffMode::Adaptive => {
                let exponent = consecutive.min(self.max_exponent);
                let factor = (self.multiplier as u64).saturating_pow(exponent);
                self.base_delay_ms.saturating_mul(factor)
            }
        };
        Duration::from_millis(ms)
    }

    pub fn transport_delay(&self) -> Duration {
        Duration::from_millis(self.transport_retry_delay_ms)
    }
}
