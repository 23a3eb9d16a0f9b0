//! Types for upload runs.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::debrid::DebridError;
use crate::descriptor::QueueError;

/// Final state of one descriptor in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Succeeded {
        id: String,
    },
    Failed {
        code: Option<i64>,
        message: String,
        rate_limited: bool,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl UploadOutcome {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            UploadOutcome::Succeeded { .. } => "succeeded",
            UploadOutcome::Failed { .. } => "failed",
            UploadOutcome::Skipped { .. } => "skipped",
        }
    }
}

/// Why a descriptor was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not instantly available on the service.
    NotCached,
    /// The run stopped before reaching it.
    Halted,
}

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    RateLimited,
    ConsecutiveFailures,
    ActiveDownloadLimit,
    AuthenticationFailed,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HaltReason::RateLimited => "too many consecutive rate-limit responses",
            HaltReason::ConsecutiveFailures => "too many consecutive failures",
            HaltReason::ActiveDownloadLimit => "active download ceiling still reached",
            HaltReason::AuthenticationFailed => "authentication rejected",
        };
        f.write_str(s)
    }
}

/// One descriptor's result.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRecord {
    pub path: PathBuf,
    pub movie_name: String,
    pub quality: String,
    pub outcome: UploadOutcome,
}

/// Counters for a finished upload run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadSummary {
    /// Descriptors found in the queue.
    pub found: usize,
    /// Descriptors considered after the per-run cap.
    pub considered: usize,
    /// Hashes sent to instant availability.
    pub cache_checked: usize,
    pub cached: usize,
    pub not_cached: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub halted: Option<HaltReason>,
    pub records: Vec<UploadRecord>,
}

impl UploadSummary {
    pub(crate) fn push(&mut self, record: UploadRecord) {
        match record.outcome {
            UploadOutcome::Succeeded { .. } => self.succeeded += 1,
            UploadOutcome::Failed { .. } => self.failed += 1,
            UploadOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.records.push(record);
    }

    /// Attempted descriptors: succeeded plus failed.
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Percentage of attempted descriptors that succeeded.
    pub fn success_rate(&self) -> f64 {
        percent(self.succeeded, self.attempted())
    }

    /// Percentage of checked hashes that were cached.
    pub fn cache_rate(&self) -> f64 {
        percent(self.cached, self.cache_checked)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Errors that abort an upload run before any work.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Debrid service unavailable: {0}")]
    Connection(#[source] DebridError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: UploadOutcome) -> UploadRecord {
        UploadRecord {
            path: PathBuf::from("a.magnet"),
            movie_name: "A".into(),
            quality: "2160p".into(),
            outcome,
        }
    }

    #[test]
    fn test_summary_counts_and_rates() {
        let mut summary = UploadSummary::default();
        summary.push(record(UploadOutcome::Succeeded { id: "1".into() }));
        summary.push(record(UploadOutcome::Succeeded { id: "2".into() }));
        summary.push(record(UploadOutcome::Succeeded { id: "3".into() }));
        summary.push(record(UploadOutcome::Failed {
            code: Some(34),
            message: "too many requests".into(),
            rate_limited: true,
        }));
        summary.push(record(UploadOutcome::Skipped {
            reason: SkipReason::Halted,
        }));

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.success_rate(), 75.0);
    }

    #[test]
    fn test_rates_with_nothing_attempted() {
        let summary = UploadSummary::default();
        assert_eq!(summary.success_rate(), 0.0);
        assert_eq!(summary.cache_rate(), 0.0);
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(UploadOutcome::Skipped {
            reason: SkipReason::NotCached,
        })
        .unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "not_cached");
    }
}
