//! Upload orchestrator integration tests.
//!
//! These tests run full upload passes over a descriptor directory with a
//! mock debrid client:
//! - Newest-first ordering and per-run caps
//! - Early termination on rate limits and repeated failures
//! - Cache-aware uploads
//! - Scrape output consumed by the upload run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use harvester_core::{
    testing::{fixtures, MockDebridClient, MockMovieSource},
    DebridError, HaltReason, MagnetDescriptor, PersistentCache, ScrapeRunner, ScraperConfig,
    UploadConfig, UploadOrchestrator, UploadOutcome, UploadPolicy,
};

struct TestHarness {
    client: Arc<MockDebridClient>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            client: Arc::new(MockDebridClient::new()),
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn config(&self) -> UploadConfig {
        UploadConfig {
            api_key: "test-key".to_string(),
            descriptor_dir: self.dir().to_path_buf(),
            active_poll_interval_ms: 1,
            policy: UploadPolicy {
                base_delay_ms: 1,
                transport_retry_delay_ms: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Write `count` descriptors; descriptor `i` has hash `hash{i}` and
    /// rank `i`, so higher numbers are newer.
    fn write_descriptors(&self, count: u64) -> Vec<MagnetDescriptor> {
        (1..=count)
            .map(|i| {
                let d = descriptor(i);
                fixtures::write_descriptor(
                    self.dir(),
                    &format!("Movie {i} (2024)/Movie {i}.2160p.magnet"),
                    &d,
                    i,
                );
                d
            })
            .collect()
    }

    fn orchestrator(&self, config: UploadConfig) -> UploadOrchestrator {
        UploadOrchestrator::new(config, self.client.clone())
    }
}

fn descriptor(i: u64) -> MagnetDescriptor {
    fixtures::descriptor(&format!("hash{i}"), &format!("Movie {i}"), "2160p")
}

#[tokio::test]
async fn test_uploads_newest_first() {
    let harness = TestHarness::new();
    let descriptors = harness.write_descriptors(4);

    let summary = harness.orchestrator(harness.config()).run().await.unwrap();

    assert_eq!(summary.found, 4);
    assert_eq!(summary.succeeded, 4);
    let expected: Vec<String> = descriptors
        .iter()
        .rev()
        .map(|d| d.magnet_link.clone())
        .collect();
    assert_eq!(harness.client.added_magnets().await, expected);
    assert_eq!(summary.success_rate(), 100.0);
}

#[tokio::test]
async fn test_per_run_cap_keeps_newest() {
    let harness = TestHarness::new();
    let descriptors = harness.write_descriptors(5);
    let config = UploadConfig {
        max_per_run: 2,
        ..harness.config()
    };

    let summary = harness.orchestrator(config).run().await.unwrap();

    assert_eq!(summary.found, 5);
    assert_eq!(summary.considered, 2);
    assert_eq!(
        harness.client.added_magnets().await,
        vec![
            descriptors[4].magnet_link.clone(),
            descriptors[3].magnet_link.clone()
        ]
    );
}

#[tokio::test]
async fn test_three_rate_limits_skip_the_rest() {
    let harness = TestHarness::new();
    harness.write_descriptors(6);
    for _ in 0..3 {
        harness.client.push_add_error(fixtures::rate_limited()).await;
    }
    let config = UploadConfig {
        policy: UploadPolicy {
            max_attempts: 1,
            ..harness.config().policy
        },
        ..harness.config()
    };

    let summary = harness.orchestrator(config).run().await.unwrap();

    assert_eq!(summary.halted, Some(HaltReason::RateLimited));
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.skipped, 3);
    assert_eq!(harness.client.added_magnets().await.len(), 3);
    assert!(summary.records[3..]
        .iter()
        .all(|r| matches!(r.outcome, UploadOutcome::Skipped { .. })));
}

#[tokio::test]
async fn test_throttling_below_threshold_continues() {
    let harness = TestHarness::new();
    harness.write_descriptors(5);
    let config = UploadConfig {
        policy: UploadPolicy {
            max_attempts: 1,
            ..harness.config().policy
        },
        ..harness.config()
    };
    // Two throttled attempts stay under the halt threshold of three.
    harness.client.push_add_error(fixtures::quota_exceeded()).await;
    harness.client.push_add_error(fixtures::rate_limited()).await;

    let summary = harness.orchestrator(config).run().await.unwrap();
    assert!(summary.halted.is_none());
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.succeeded, 3);
}

#[tokio::test]
async fn test_consecutive_failures_halt() {
    let harness = TestHarness::new();
    harness.write_descriptors(7);
    for _ in 0..5 {
        harness
            .client
            .push_add_error(DebridError::Api {
                status: 400,
                code: Some(2),
                message: "bad magnet".to_string(),
            })
            .await;
    }

    let summary = harness.orchestrator(harness.config()).run().await.unwrap();

    assert_eq!(summary.halted, Some(HaltReason::ConsecutiveFailures));
    assert_eq!(summary.failed, 5);
    assert_eq!(summary.skipped, 2);
}

#[tokio::test]
async fn test_unreadable_descriptor_counts_as_failed() {
    let harness = TestHarness::new();
    harness.write_descriptors(2);
    let broken = harness.dir().join("broken.magnet");
    std::fs::write(&broken, "not json").unwrap();

    let summary = harness.orchestrator(harness.config()).run().await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert!(summary
        .records
        .iter()
        .any(|r| r.path == broken && matches!(r.outcome, UploadOutcome::Failed { .. })));
}

#[tokio::test]
async fn test_cached_only_uploads_video_variants() {
    let harness = TestHarness::new();
    let descriptors = harness.write_descriptors(3);
    harness
        .client
        .set_availability_body(json!({
            "hash1": {"rd": [{"1": {"filename": "Movie.1.2160p.mkv", "filesize": 5}}]},
            "hash2": {"rd": [{"1": {"filename": "Movie.2.nfo", "filesize": 1}}]},
        }))
        .await;
    let config = UploadConfig {
        cached_only: true,
        ..harness.config()
    };

    let summary = harness.orchestrator(config).run().await.unwrap();

    assert_eq!(summary.cache_checked, 3);
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.not_cached, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        harness.client.added_magnets().await,
        vec![descriptors[0].magnet_link.clone()]
    );
    assert!((summary.cache_rate() - 33.33).abs() < 0.1);
}

#[tokio::test]
async fn test_cached_only_checks_in_batches() {
    let harness = TestHarness::new();
    harness.write_descriptors(25);
    let config = UploadConfig {
        cached_only: true,
        ..harness.config()
    };

    let summary = harness.orchestrator(config).run().await.unwrap();

    let batches = harness.client.availability_batches().await;
    assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![10, 10, 5]);
    assert_eq!(summary.not_cached, 25);
    assert!(harness.client.added_magnets().await.is_empty());
}

#[tokio::test]
async fn test_active_poll_failure_does_not_block() {
    let harness = TestHarness::new();
    harness.write_descriptors(2);
    harness
        .client
        .set_list_error(DebridError::Timeout)
        .await;
    let config = UploadConfig {
        max_active_downloads: 1,
        ..harness.config()
    };

    let summary = harness.orchestrator(config).run().await.unwrap();
    // The failed poll lets the first upload through; the second poll sees it.
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.halted, Some(HaltReason::ActiveDownloadLimit));
}

#[tokio::test]
async fn test_uploads_scrape_output() {
    let harness = TestHarness::new();
    let source = Arc::new(MockMovieSource::new());
    source.set_count(2).await;
    source
        .set_page(
            1,
            vec![
                fixtures::movie(1, "Heat", 1995, &["2160p"]),
                fixtures::movie(2, "Ronin", 1998, &["2160p"]),
            ],
        )
        .await;
    let scrape_config = ScraperConfig {
        output_dir: harness.dir().join("magnets"),
        posters: false,
        ..Default::default()
    };
    let mut cache = PersistentCache::empty(harness.dir().join("cache.json"));
    ScrapeRunner::new(scrape_config, source)
        .run(&mut cache)
        .await
        .unwrap();

    let config = UploadConfig {
        descriptor_dir: harness.dir().join("magnets"),
        ..harness.config()
    };
    let summary = harness.orchestrator(config).run().await.unwrap();

    assert_eq!(summary.succeeded, 2);
    let added = harness.client.added_magnets().await;
    for id in [1, 2] {
        let hash = fixtures::hash_for(id, "2160p");
        assert!(added.iter().any(|m| m.contains(&hash)));
    }
    let paths: Vec<PathBuf> = summary.records.iter().map(|r| r.path.clone()).collect();
    assert!(paths.iter().all(|p| p.extension().is_some_and(|e| e == "magnet")));
}

#[tokio::test]
async fn test_interrupted_write_is_recovered_by_next_scrape() {
    let harness = TestHarness::new();
    let out = harness.dir().join("magnets");
    let source = Arc::new(MockMovieSource::new());
    source.set_count(1).await;
    source
        .set_page(1, vec![fixtures::movie(1, "Heat", 1995, &["1080p"])])
        .await;

    // A killed run left a truncated descriptor and a temp file behind.
    let stale = out.join("Heat (1995) (1995)/Heat (1995).1080p.magnet");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "{\"magnet_li").unwrap();
    std::fs::write(stale.with_file_name("Heat (1995).1080p.magnet.1234abcd.tmp"), "{").unwrap();

    let scrape_config = ScraperConfig {
        quality: "all".to_string(),
        output_dir: out.clone(),
        posters: false,
        append_imdb_id: false,
        ..Default::default()
    };
    let mut cache = PersistentCache::empty(harness.dir().join("cache.json"));
    let scraped = ScrapeRunner::new(scrape_config, source)
        .run(&mut cache)
        .await
        .unwrap();
    assert_eq!(scraped.written, 1);
    assert_eq!(scraped.existing, 0);
    assert_eq!(scraped.descriptors_on_disk, Some(1));
    assert!(cache.contains("1", "1080p"));

    let config = UploadConfig {
        descriptor_dir: out,
        ..harness.config()
    };
    let summary = harness.orchestrator(config).run().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert!(harness.client.added_magnets().await[0].contains(&fixtures::hash_for(1, "1080p")));
}
