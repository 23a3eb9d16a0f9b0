//! Retry with exponential backoff for listing requests.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::SourceError;

/// Browser identities rotated between attempts.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Pick a random User-Agent string.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Backoff parameters for transport failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base wait after a timeout, doubled per attempt (default: 2000ms).
    #[serde(default = "default_timeout_base")]
    pub timeout_base_ms: u64,
    /// Base wait after a connection error, doubled per attempt (default: 3000ms).
    #[serde(default = "default_connect_base")]
    pub connect_base_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_base() -> u64 {
    2000
}

fn default_connect_base() -> u64 {
    3000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_base_ms: default_timeout_base(),
            connect_base_ms: default_connect_base(),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after `error` on the zero-based `attempt`.
    ///
    /// Returns `None` for errors that are not worth retrying.
    pub fn delay_for(&self, error: &SourceError, attempt: u32) -> Option<Duration> {
        let base = match error {
            SourceError::Timeout => self.timeout_base_ms,
            SourceError::ConnectionFailed(_) => self.connect_base_ms,
            _ => return None,
        };
        let factor = 1u64 << attempt.min(16);
        Some(Duration::from_millis(base.saturating_mul(factor)))
    }
}

/// Run `op` until it succeeds, a non-retryable error occurs, or attempts run out.
///
/// `op` receives the zero-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let is_last = attempt + 1 >= max_attempts;
                match policy.delay_for(&e, attempt) {
                    Some(delay) if !is_last => {
                        warn!(
                            request = what,
                            attempt = attempt + 1,
                            max_attempts,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %e,
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    _ => {
                        if is_last && policy.delay_for(&e, attempt).is_some() {
                            warn!(request = what, max_attempts, "Max retries exceeded");
                        }
                        return Err(e);
                    }
                }
            }
        }
    }
}
