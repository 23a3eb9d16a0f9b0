//! Upload run implementation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::debrid::{AddMagnetResult, Availability, DebridClient, DebridError, UserInfo};
use crate::descriptor::{DescriptorQueue, MagnetDescriptor, QueueError, QueuedDescriptor};
use crate::metrics;

use super::{
    HaltReason, SkipReason, UploadConfig, UploadError, UploadOutcome, UploadRecord, UploadSummary,
};

/// Transient per-run state. Consecutive counters reset on any success.
#[derive(Debug, Default)]
struct AttemptState {
    consecutive_rate_limits: u32,
    consecutive_failures: u32,
    /// Active remote downloads at the last poll, plus uploads since.
    active_downloads: Option<usize>,
}

/// Drives one upload run over the descriptor queue.
pub struct UploadOrchestrator {
    config: UploadConfig,
    client: Arc<dyn DebridClient>,
    queue: DescriptorQueue,
}

impl UploadOrchestrator {
    pub fn new(config: UploadConfig, client: Arc<dyn DebridClient>) -> Self {
        let queue = DescriptorQueue::new(&config.descriptor_dir);
        Self {
            config,
            client,
            queue,
        }
    }

    /// Single authenticated probe.
    pub async fn test_connection(&self) -> Result<UserInfo, DebridError> {
        let user = self.client.user().await?;
        info!(
            backend = self.client.name(),
            username = %user.username,
            premium_days = user.premium_days(),
            "Connected to debrid service"
        );
        Ok(user)
    }

    /// Instant availability for `hashes`, queried in batches. A failed batch
    /// is logged and contributes nothing.
    pub async fn check_cache_availability(&self, hashes: &[String]) -> Availability {
        let batch_size = self.config.cache_check_batch_size.max(1);
        let batches = hashes.len().div_ceil(batch_size);
        let mut availability = Availability::new();

        for (i, batch) in hashes.chunks(batch_size).enumerate() {
            debug!(batch = i + 1, batches, "Checking instant availability");
            match self.client.instant_availability(batch).await {
                Ok(found) => availability.extend(found),
                Err(e) => warn!(batch = i + 1, error = %e, "Cache check failed for batch"),
            }
        }
        availability
    }

    /// Submit one descriptor's magnet, retrying rate limits and transport
    /// errors per the policy.
    pub async fn upload(&self, descriptor: &MagnetDescriptor) -> UploadOutcome {
        match self.submit(&descriptor.magnet_link, 0).await {
            Ok(result) => UploadOutcome::Succeeded { id: result.id },
            Err(e) => failure(&e),
        }
    }

    /// Select every file of an uploaded torrent. Returns the number selected.
    pub async fn select_all_files(&self, id: &str) -> Result<usize, DebridError> {
        let details = self.client.torrent_info(id).await?;
        if details.files.is_empty() {
            info!(id, "No files to select");
            return Ok(0);
        }
        let file_ids: Vec<u64> = details.files.iter().map(|f| f.id).collect();
        self.client.select_files(id, &file_ids).await?;
        info!(id, files = file_ids.len(), "Selected files");
        Ok(file_ids.len())
    }

    /// `prior_rate_limits` feeds the adaptive backoff exponent.
    async fn submit(
        &self,
        magnet: &str,
        prior_rate_limits: u32,
    ) -> Result<AddMagnetResult, DebridError> {
        let policy = &self.config.policy;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let err = match self.client.add_magnet(magnet).await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };
            let is_last = attempt + 1 >= max_attempts;
            let delay = if is_last {
                None
            } else if err.is_rate_limit_or_quota() {
                Some(policy.backoff_delay(prior_rate_limits + attempt))
            } else if err.is_transport() {
                Some(policy.transport_delay())
            } else {
                None
            };
            let Some(delay) = delay else {
                return Err(err);
            };
            warn!(
                attempt = attempt + 1,
                max_attempts,
                wait_ms = delay.as_millis() as u64,
                error = %err,
                "Upload refused, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Block while the active-download ceiling is reached, re-polling a
    /// bounded number of times.
    async fn wait_for_slot(&self, state: &mut AttemptState) -> Result<(), HaltReason> {
        let ceiling = self.config.max_active_downloads;
        if ceiling == 0 {
            return Ok(());
        }
        if matches!(state.active_downloads, Some(n) if n < ceiling) {
            return Ok(());
        }

        let polls = self.config.max_active_polls.max(1);
        for poll in 0..polls {
            if poll > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.active_poll_interval_ms))
                    .await;
            }
            let active = match self.client.list_torrents().await {
                Ok(list) => list.iter().filter(|t| t.is_active()).count(),
                Err(e) => {
                    warn!(error = %e, "Could not count active downloads, continuing");
                    state.active_downloads = None;
                    return Ok(());
                }
            };
            state.active_downloads = Some(active);
            if active < ceiling {
                return Ok(());
            }
            info!(
                active,
                ceiling,
                poll = poll + 1,
                polls,
                "Active download ceiling reached, waiting"
            );
        }
        Err(HaltReason::ActiveDownloadLimit)
    }

    /// Run one upload pass over the queue.
    pub async fn run(&self) -> Result<UploadSummary, UploadError> {
        let mut summary = UploadSummary::default();

        let mut entries = match self.queue.scan().await {
            Ok(entries) => entries,
            Err(QueueError::DirectoryNotFound(dir)) => {
                warn!(dir = %dir.display(), "Descriptor directory not found, nothing to upload");
                return Ok(summary);
            }
            Err(e) => return Err(e.into()),
        };

        self.test_connection()
            .await
            .map_err(UploadError::Connection)?;

        summary.found = entries.len();
        if entries.is_empty() {
            info!("No descriptors found to upload");
            return Ok(summary);
        }

        let limit = self.config.run_limit();
        if entries.len() > limit {
            info!(found = entries.len(), limit, "Capping descriptors for this run");
            entries.truncate(limit);
        }
        summary.considered = entries.len();

        let mut pending = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.queue.load(&entry).await {
                Ok(d) if !d.magnet_link.is_empty() => pending.push((entry, d)),
                Ok(_) => {
                    warn!(path = %entry.path.display(), "Descriptor has no magnet link");
                    record(&mut summary, &entry, None, unreadable("missing magnet link"));
                }
                Err(e) => {
                    warn!(error = %e, "Unreadable descriptor");
                    record(&mut summary, &entry, None, unreadable(&e.to_string()));
                }
            }
        }

        if self.config.cached_only {
            pending = self.keep_cached(pending, &mut summary).await;
        }

        let total = pending.len();
        let mut state = AttemptState::default();
        let mut remaining = pending.into_iter().enumerate();

        while let Some((i, (entry, descriptor))) = remaining.next() {
            if let Err(reason) = self.wait_for_slot(&mut state).await {
                summary.halted = Some(reason);
                record(&mut summary, &entry, Some(&descriptor), halted());
                break;
            }

            info!(
                n = i + 1,
                total,
                movie = %descriptor.movie_name,
                quality = %descriptor.quality,
                "Uploading"
            );

            let outcome = match self
                .submit(&descriptor.magnet_link, state.consecutive_rate_limits)
                .await
            {
                Ok(result) => {
                    info!(movie = %descriptor.movie_name, id = %result.id, "Uploaded");
                    state.consecutive_failures = 0;
                    state.consecutive_rate_limits = 0;
                    state.active_downloads = state.active_downloads.map(|n| n + 1);
                    if let Err(e) = self.select_all_files(&result.id).await {
                        warn!(id = %result.id, error = %e, "File selection failed");
                    }
                    UploadOutcome::Succeeded { id: result.id }
                }
                Err(e) => {
                    warn!(movie = %descriptor.movie_name, error = %e, "Upload failed");
                    state.consecutive_failures += 1;
                    if e.is_rate_limit_or_quota() {
                        state.consecutive_rate_limits += 1;
                    } else {
                        state.consecutive_rate_limits = 0;
                    }
                    summary.halted = self.halt_reason(&state, &e);
                    failure(&e)
                }
            };
            record(&mut summary, &entry, Some(&descriptor), outcome);

            if let Some(reason) = summary.halted {
                warn!(
                    %reason,
                    remaining = total - i - 1,
                    "Stopping early, remaining descriptors deferred to the next run"
                );
                break;
            }
        }

        for (_, (entry, descriptor)) in remaining {
            record(&mut summary, &entry, Some(&descriptor), halted());
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            success_rate = format!("{:.1}%", summary.success_rate()),
            "Upload run finished"
        );
        Ok(summary)
    }

    fn halt_reason(&self, state: &AttemptState, error: &DebridError) -> Option<HaltReason> {
        let policy = &self.config.policy;
        if matches!(error, DebridError::AuthenticationFailed(_)) {
            Some(HaltReason::AuthenticationFailed)
        } else if state.consecutive_rate_limits >= policy.rate_limit_halt_threshold {
            Some(HaltReason::RateLimited)
        } else if state.consecutive_failures >= policy.consecutive_failure_threshold {
            Some(HaltReason::ConsecutiveFailures)
        } else {
            None
        }
    }

    /// Drop descriptors that are not instantly available, recording them
    /// as skipped.
    async fn keep_cached(
        &self,
        pending: Vec<(QueuedDescriptor, MagnetDescriptor)>,
        summary: &mut UploadSummary,
    ) -> Vec<(QueuedDescriptor, MagnetDescriptor)> {
        let hashes: Vec<String> = pending.iter().filter_map(|(_, d)| d.info_hash()).collect();
        summary.cache_checked = hashes.len();
        info!(count = hashes.len(), "Checking instant availability");
        let availability = self.check_cache_availability(&hashes).await;

        let mut cached = Vec::new();
        for (entry, descriptor) in pending {
            let variants = descriptor
                .info_hash()
                .and_then(|h| availability.get(&h));
            match variants {
                Some(variants) => {
                    info!(
                        movie = %descriptor.movie_name,
                        quality = %descriptor.quality,
                        variants = variants.len(),
                        "Cached"
                    );
                    metrics::CACHE_CHECKS.with_label_values(&["hit"]).inc();
                    summary.cached += 1;
                    cached.push((entry, descriptor));
                }
                None => {
                    info!(
                        movie = %descriptor.movie_name,
                        quality = %descriptor.quality,
                        "Not cached"
                    );
                    metrics::CACHE_CHECKS.with_label_values(&["miss"]).inc();
                    summary.not_cached += 1;
                    record(
                        summary,
                        &entry,
                        Some(&descriptor),
                        UploadOutcome::Skipped {
                            reason: SkipReason::NotCached,
                        },
                    );
                }
            }
        }

        info!(
            cached = summary.cached,
            not_cached = summary.not_cached,
            cache_rate = format!("{:.1}%", summary.cache_rate()),
            "Cache check finished"
        );
        cached
    }
}

fn failure(e: &DebridError) -> UploadOutcome {
    UploadOutcome::Failed {
        code: e.code(),
        message: e.to_string(),
        rate_limited: e.is_rate_limit_or_quota(),
    }
}

fn unreadable(message: &str) -> UploadOutcome {
    UploadOutcome::Failed {
        code: None,
        message: message.to_string(),
        rate_limited: false,
    }
}

fn halted() -> UploadOutcome {
    UploadOutcome::Skipped {
        reason: SkipReason::Halted,
    }
}

fn record(
    summary: &mut UploadSummary,
    entry: &QueuedDescriptor,
    descriptor: Option<&MagnetDescriptor>,
    outcome: UploadOutcome,
) {
    metrics::UPLOADS.with_label_values(&[outcome.label()]).inc();
    let (movie_name, quality) = match descriptor {
        Some(d) => (d.movie_name.clone(), d.quality.clone()),
        None => (
            entry
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            String::new(),
        ),
    };
    summary.push(UploadRecord {
        path: entry.path.clone(),
        movie_name,
        quality,
        outcome,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockDebridClient};
    use crate::upload::UploadPolicy;

    fn fast_config() -> UploadConfig {
        UploadConfig {
            api_key: "k".into(),
            policy: UploadPolicy {
                base_delay_ms: 1,
                transport_retry_delay_ms: 1,
                ..Default::default()
            },
            active_poll_interval_ms: 1,
            ..Default::default()
        }
    }

    fn descriptor(hash: &str) -> MagnetDescriptor {
        fixtures::descriptor(hash, "Movie (2024)", "2160p")
    }

    #[tokio::test]
    async fn test_upload_retries_rate_limit_then_succeeds() {
        let client = Arc::new(MockDebridClient::new());
        client.push_add_error(fixtures::rate_limited()).await;
        let orchestrator = UploadOrchestrator::new(fast_config(), client.clone());

        let outcome = orchestrator.upload(&descriptor("aa")).await;
        assert!(matches!(outcome, UploadOutcome::Succeeded { .. }));
        assert_eq!(client.added_magnets().await.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_gives_up_and_keeps_error_code() {
        let client = Arc::new(MockDebridClient::new());
        client.push_add_error(fixtures::rate_limited()).await;
        client.push_add_error(fixtures::rate_limited()).await;
        let orchestrator = UploadOrchestrator::new(fast_config(), client.clone());

        let outcome = orchestrator.upload(&descriptor("aa")).await;
        match outcome {
            UploadOutcome::Failed {
                code, rate_limited, ..
            } => {
                assert_eq!(code, Some(34));
                assert!(rate_limited);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(client.added_magnets().await.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_does_not_retry_other_errors() {
        let client = Arc::new(MockDebridClient::new());
        client
            .push_add_error(DebridError::Api {
                status: 400,
                code: Some(19),
                message: "hoster unavailable".into(),
            })
            .await;
        let orchestrator = UploadOrchestrator::new(fast_config(), client.clone());

        let outcome = orchestrator.upload(&descriptor("aa")).await;
        assert!(matches!(outcome, UploadOutcome::Failed { code: Some(19), .. }));
        assert_eq!(client.added_magnets().await.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_retries_transport_errors() {
        let client = Arc::new(MockDebridClient::new());
        client.push_add_error(DebridError::Timeout).await;
        let orchestrator = UploadOrchestrator::new(fast_config(), client.clone());

        let outcome = orchestrator.upload(&descriptor("aa")).await;
        assert!(matches!(outcome, UploadOutcome::Succeeded { .. }));
    }

    #[tokio::test]
    async fn test_select_all_files() {
        let client = Arc::new(MockDebridClient::new());
        client.set_files(vec![1, 2, 5]).await;
        let orchestrator = UploadOrchestrator::new(fast_config(), client.clone());

        assert_eq!(orchestrator.select_all_files("T1").await.unwrap(), 3);
        assert_eq!(
            client.selections().await,
            vec![("T1".to_string(), vec![1, 2, 5])]
        );
    }

    #[tokio::test]
    async fn test_select_all_files_without_files() {
        let client = Arc::new(MockDebridClient::new());
        let orchestrator = UploadOrchestrator::new(fast_config(), client.clone());

        assert_eq!(orchestrator.select_all_files("T1").await.unwrap(), 0);
        assert!(client.selections().await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_check_batches_and_tolerates_failures() {
        let client = Arc::new(MockDebridClient::new());
        client.set_cached(&["h1", "h4"]).await;
        client.fail_availability_batch(1).await;
        let config = UploadConfig {
            cache_check_batch_size: 2,
            ..fast_config()
        };
        let orchestrator = UploadOrchestrator::new(config, client.clone());

        let hashes: Vec<String> = ["h1", "h2", "h3", "h4", "h5"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let availability = orchestrator.check_cache_availability(&hashes).await;

        // Batches: [h1,h2] ok, [h3,h4] fails, [h5] ok.
        assert_eq!(client.availability_batches().await.len(), 3);
        assert!(availability.contains_key("h1"));
        assert!(!availability.contains_key("h4"));
    }

    #[tokio::test]
    async fn test_active_ceiling_defers_everything() {
        let dir = tempfile::TempDir::new().unwrap();
        fixtures::write_descriptor(dir.path(), "a.magnet", &descriptor("aa"), 10);
        fixtures::write_descriptor(dir.path(), "b.magnet", &descriptor("bb"), 20);

        let client = Arc::new(MockDebridClient::new());
        client.set_active_downloads(3).await;
        let config = UploadConfig {
            descriptor_dir: dir.path().to_path_buf(),
            max_active_downloads: 3,
            max_active_polls: 2,
            ..fast_config()
        };
        let summary = UploadOrchestrator::new(config, client.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.halted, Some(HaltReason::ActiveDownloadLimit));
        assert_eq!(summary.skipped, 2);
        assert!(client.added_magnets().await.is_empty());
        assert_eq!(client.list_calls().await, 2);
    }

    #[tokio::test]
    async fn test_active_ceiling_allows_until_full() {
        let dir = tempfile::TempDir::new().unwrap();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            fixtures::write_descriptor(
                dir.path(),
                &format!("{}.magnet", name),
                &descriptor(name),
                i as u64,
            );
        }

        let client = Arc::new(MockDebridClient::new());
        client.set_active_downloads(1).await;
        let config = UploadConfig {
            descriptor_dir: dir.path().to_path_buf(),
            max_active_downloads: 3,
            max_active_polls: 1,
            ..fast_config()
        };
        let summary = UploadOrchestrator::new(config, client.clone())
            .run()
            .await
            .unwrap();

        // 1 active + 2 uploads reaches the ceiling; the third re-polls and stops.
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.halted, Some(HaltReason::ActiveDownloadLimit));
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let client = Arc::new(MockDebridClient::new());
        let config = UploadConfig {
            descriptor_dir: dir.path().join("missing"),
            ..fast_config()
        };
        let summary = UploadOrchestrator::new(config, client.clone())
            .run()
            .await
            .unwrap();
        assert_eq!(summary.found, 0);
        assert_eq!(client.user_calls().await, 0);
    }

    #[tokio::test]
    async fn test_failed_connection_aborts_run() {
        let dir = tempfile::TempDir::new().unwrap();
        fixtures::write_descriptor(dir.path(), "a.magnet", &descriptor("aa"), 1);
        let client = Arc::new(MockDebridClient::new());
        client
            .set_user_error(DebridError::AuthenticationFailed("bad token".into()))
            .await;
        let config = UploadConfig {
            descriptor_dir: dir.path().to_path_buf(),
            ..fast_config()
        };

        let result = UploadOrchestrator::new(config, client.clone()).run().await;
        assert!(matches!(result, Err(UploadError::Connection(_))));
        assert!(client.added_magnets().await.is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_mid_run_halts() {
        let dir = tempfile::TempDir::new().unwrap();
        fixtures::write_descriptor(dir.path(), "a.magnet", &descriptor("aa"), 2);
        fixtures::write_descriptor(dir.path(), "b.magnet", &descriptor("bb"), 1);
        let client = Arc::new(MockDebridClient::new());
        client
            .push_add_error(DebridError::AuthenticationFailed("expired".into()))
            .await;
        let config = UploadConfig {
            descriptor_dir: dir.path().to_path_buf(),
            ..fast_config()
        };

        let summary = UploadOrchestrator::new(config, client.clone())
            .run()
            .await
            .unwrap();
        assert_eq!(summary.halted, Some(HaltReason::AuthenticationFailed));
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
    }
}
