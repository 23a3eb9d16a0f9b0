//! Scrape run implementation.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::PersistentCache;
use crate::descriptor::DescriptorQueue;
use crate::export::CsvExporter;
use crate::filter::{Candidate, ReleaseFilter};
use crate::metrics;
use crate::persister::{
    self, AutoContinue, ContinueDecider, EscapeHatch, HatchDecision, MagnetPersister, PersistError,
    WriteOutcome,
};
use crate::source::{adjusted_movie_count, plan_pages, ListQuery, MovieSource, PAGE_SIZE};

use super::{ScrapeError, ScrapeSummary, ScraperConfig};

/// Drives one scrape run.
pub struct ScrapeRunner {
    config: ScraperConfig,
    source: Arc<dyn MovieSource>,
    persister: MagnetPersister,
    exporter: Option<CsvExporter>,
    decider: Arc<dyn ContinueDecider>,
}

impl ScrapeRunner {
    /// Create a runner. Posters, when enabled, are downloaded from `source`.
    pub fn new(config: ScraperConfig, source: Arc<dyn MovieSource>) -> Self {
        let persister =
            MagnetPersister::new(config.persister_settings()).with_cover_source(source.clone());
        let exporter = config
            .writes_csv()
            .then(|| CsvExporter::new(&config.csv_path));
        Self {
            config,
            source,
            persister,
            exporter,
            decider: Arc::new(AutoContinue),
        }
    }

    /// Replace the decider consulted after a streak of existing descriptors.
    pub fn with_decider(mut self, decider: Arc<dyn ContinueDecider>) -> Self {
        self.decider = decider;
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Run to completion, saving `cache` at the end.
    ///
    /// Only an unreachable listing source is an error; page, write and
    /// cache-save failures are logged and counted.
    pub async fn run(&self, cache: &mut PersistentCache) -> Result<ScrapeSummary, ScrapeError> {
        let query = self.config.list_query();
        let mut summary = ScrapeSummary::default();

        info!(
            source = self.source.name(),
            quality = %query.quality,
            genre = %query.genre,
            minimum_rating = query.minimum_rating,
            sort_by = %query.sort_by,
            order_by = %query.order_by,
            year_limit = self.config.year_limit,
            start_page = self.config.start_page,
            output_dir = %self.config.output_dir.display(),
            csv_only = self.config.csv_only,
            parallel = self.config.parallel,
            "Starting scrape"
        );

        let total = self
            .source
            .movie_count(&query)
            .await
            .map_err(ScrapeError::SourceUnavailable)?;
        let adjusted = adjusted_movie_count(total, self.config.start_page, PAGE_SIZE);
        summary.total_movies = adjusted;
        if adjusted <= 0 {
            info!("No movies found with the given parameters");
            return Ok(summary);
        }

        let pages = plan_pages(adjusted, PAGE_SIZE, self.config.start_page);
        summary.pages_planned = pages.len();
        info!(movies = adjusted, pages = summary.pages_planned, "Query successful");

        let mut filter = ReleaseFilter::new(self.config.filter_settings());
        let mut hatch = EscapeHatch::new(self.config.existing_streak_limit, self.decider.clone());

        for page in pages {
            if !self
                .scrape_page(&query, page, &mut filter, &mut hatch, cache, &mut summary)
                .await
            {
                summary.aborted = true;
                info!(page, "Stopping scrape at the continue prompt");
                break;
            }
        }

        if !self.config.csv_only {
            if let Err(e) = cache.save().await {
                warn!(error = %e, "Failed to save release cache");
            }
            let queue = DescriptorQueue::new(&self.config.output_dir);
            match queue.scan().await {
                Ok(entries) => summary.descriptors_on_disk = Some(entries.len()),
                Err(e) => debug!(error = %e, "Could not count descriptors on disk"),
            }
        }

        info!(
            pages_fetched = summary.pages_fetched,
            pages_failed = summary.pages_failed,
            releases = summary.releases_seen,
            accepted = summary.accepted,
            written = summary.written,
            existing = summary.existing,
            failed = summary.write_failed,
            csv_rows = summary.csv_rows,
            on_disk = ?summary.descriptors_on_disk,
            aborted = summary.aborted,
            "Scrape finished"
        );
        Ok(summary)
    }

    /// Process one page. Returns false when the run should stop.
    async fn scrape_page(
        &self,
        query: &ListQuery,
        page: u32,
        filter: &mut ReleaseFilter,
        hatch: &mut EscapeHatch,
        cache: &mut PersistentCache,
        summary: &mut ScrapeSummary,
    ) -> bool {
        let movies = match self.source.fetch_page(query, page).await {
            Ok(movies) => movies,
            Err(e) => {
                warn!(page, error = %e, "Failed to fetch page, continuing with the next");
                metrics::PAGES_FAILED.inc();
                summary.pages_failed += 1;
                return true;
            }
        };
        metrics::PAGES_FETCHED.inc();
        summary.pages_fetched += 1;

        if movies.is_empty() {
            info!(page, "No movies on this page");
            return true;
        }

        let mut accepted: Vec<Candidate> = Vec::new();
        for movie in &movies {
            summary.releases_seen += 1;
            let evaluation = filter.candidates(movie, cache);
            for rejection in &evaluation.rejections {
                debug!(id = movie.id, title = %movie.title, %rejection, "Rejected");
                metrics::RELEASES_REJECTED
                    .with_label_values(&[rejection.reason()])
                    .inc();
                *summary.rejected.entry(rejection.reason()).or_default() += 1;
            }
            if evaluation.is_empty() {
                continue;
            }
            filter.mark_seen(&movie.release_id());
            accepted.extend(evaluation.accepted);
        }
        summary.accepted += accepted.len();

        if let Some(exporter) = &self.exporter {
            match exporter.append(&csv_rows(&accepted)).await {
                Ok(rows) => summary.csv_rows += rows,
                Err(e) => warn!(page, error = %e, "Failed to write CSV rows"),
            }
        }
        if self.config.csv_only {
            return true;
        }

        let concurrency = self.config.write_concurrency();
        for chunk in accepted.chunks(concurrency) {
            if hatch.check().await == HatchDecision::Abort {
                return false;
            }
            for (candidate, result) in chunk.iter().zip(self.write_all(chunk).await) {
                self.fold(candidate, result, hatch, cache, summary);
            }
        }
        true
    }

    /// Write a chunk concurrently. Results come back in chunk order.
    async fn write_all(&self, chunk: &[Candidate]) -> Vec<Result<WriteOutcome, PersistError>> {
        let mut results: Vec<(usize, Result<WriteOutcome, PersistError>)> =
            stream::iter(chunk.iter().enumerate())
                .map(|(i, candidate)| async move { (i, self.persister.write(candidate).await) })
                .buffer_unordered(chunk.len().max(1))
                .collect()
                .await;
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, r)| r).collect()
    }

    fn fold(
        &self,
        candidate: &Candidate,
        result: Result<WriteOutcome, PersistError>,
        hatch: &mut EscapeHatch,
        cache: &mut PersistentCache,
        summary: &mut ScrapeSummary,
    ) {
        match result {
            Ok(outcome) => {
                match &outcome {
                    WriteOutcome::Written(_) => {
                        metrics::DESCRIPTORS.with_label_values(&["written"]).inc();
                        summary.written += 1;
                    }
                    WriteOutcome::AlreadyExists(path) => {
                        info!(
                            name = %candidate.display_name,
                            path = %path.display(),
                            "Descriptor already exists, skipping"
                        );
                        metrics::DESCRIPTORS.with_label_values(&["existing"]).inc();
                        summary.existing += 1;
                    }
                }
                hatch.observe(&outcome);
                persister::record(cache, candidate);
            }
            Err(e) => {
                warn!(name = %candidate.display_name, quality = %candidate.quality, error = %e, "Failed to write descriptor");
                metrics::DESCRIPTORS.with_label_values(&["failed"]).inc();
                summary.write_failed += 1;
            }
        }
    }
}

/// One row per (release, quality); genre fan-out would repeat rows.
fn csv_rows(accepted: &[Candidate]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    accepted
        .iter()
        .filter(|c| seen.insert((c.release_id.as_str(), c.quality.as_str())))
        .cloned()
        .collect()
}
