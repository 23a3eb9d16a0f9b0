//! Prometheus metrics for scrape and upload runs.
//!
//! Runs are short-lived batch jobs, so nothing is served over HTTP: the
//! registry is rendered in text exposition format and written to a
//! node-exporter textfile when a run ends.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::path::Path;

/// Registry holding every harvester metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Scrape
// =============================================================================

/// Listing pages fetched successfully.
pub static PAGES_FETCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("harvester_pages_fetched_total", "Listing pages fetched").expect("valid metric")
});

/// Listing pages skipped after retries ran out.
pub static PAGES_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "harvester_pages_failed_total",
        "Listing pages that failed after retries",
    )
    .expect("valid metric")
});

/// Descriptor writes by outcome.
pub static DESCRIPTORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_descriptors_total", "Descriptor write outcomes"),
        &["outcome"], // "written", "existing", "failed"
    )
    .expect("valid metric")
});

/// Rejected releases and variants by reason.
pub static RELEASES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvester_releases_rejected_total",
            "Releases or variants rejected by the filter",
        ),
        &["reason"],
    )
    .expect("valid metric")
});

// =============================================================================
// Upload
// =============================================================================

/// Upload outcomes per descriptor.
pub static UPLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_uploads_total", "Descriptor upload outcomes"),
        &["outcome"], // "succeeded", "failed", "skipped"
    )
    .expect("valid metric")
});

/// Instant-availability results per hash.
pub static CACHE_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvester_cache_checks_total",
            "Instant-availability lookups by result",
        ),
        &["result"], // "hit", "miss"
    )
    .expect("valid metric")
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(PAGES_FETCHED.clone()))
        .expect("metric registered once");
    registry
        .register(Box::new(PAGES_FAILED.clone()))
        .expect("metric registered once");
    registry
        .register(Box::new(DESCRIPTORS.clone()))
        .expect("metric registered once");
    registry
        .register(Box::new(RELEASES_REJECTED.clone()))
        .expect("metric registered once");
    registry
        .register(Box::new(UPLOADS.clone()))
        .expect("metric registered once");
    registry
        .register(Box::new(CACHE_CHECKS.clone()))
        .expect("metric registered once");
}

/// Render all metrics in Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Write the rendered metrics to `path`, replacing it atomically.
pub async fn write_textfile(path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
    }
    let tmp = path.with_extension("prom.tmp");
    tokio::fs::write(&tmp, render()).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_registered_metrics() {
        PAGES_FETCHED.inc();
        UPLOADS.with_label_values(&["succeeded"]).inc();

        let text = render();
        assert!(text.contains("harvester_pages_fetched_total"));
        assert!(text.contains("harvester_uploads_total{outcome=\"succeeded\"}"));
    }

    #[tokio::test]
    async fn test_write_textfile() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("node/harvester.prom");
        DESCRIPTORS.with_label_values(&["written"]).inc();

        write_textfile(&path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("harvester_descriptors_total"));
        assert!(!path.with_extension("prom.tmp").exists());
    }
}
