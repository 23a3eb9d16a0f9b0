//! Minimum-interval request pacing.

use tokio::time::{Duration, Instant};

/// Spaces requests at least `min_interval` apart.
///
/// The first request is never delayed.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// How long a request issued at `now` must wait.
    pub fn delay_at(&self, now: Instant) -> Duration {
        match self.last_request {
            Some(last) => self.min_interval.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Wait until the next request is allowed and claim the slot.
    pub async fn wait(&mut self) {
        let delay = self.delay_at(Instant::now());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.last_request = Some(Instant::now());
    }
}
