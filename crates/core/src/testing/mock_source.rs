//! Mock movie listing source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::source::{ListQuery, Movie, MovieSource, SourceError};

/// Mock implementation of the MovieSource trait.
///
/// Pages are served from a map; pages that were never set come back empty.
///
/// ```rust,ignore
/// let source = MockMovieSource::new();
/// source.set_count(120).await;
/// source.set_page(1, vec![fixtures::movie(1, "Heat", 1995, &["2160p"])]).await;
/// source.fail_page(2).await;
/// ```
#[derive(Debug)]
pub struct MockMovieSource {
    count: Arc<RwLock<u64>>,
    pages: Arc<RwLock<HashMap<u32, Vec<Movie>>>>,
    failing_pages: Arc<RwLock<HashSet<u32>>>,
    /// Bytes returned for every cover request.
    cover: Arc<RwLock<Vec<u8>>>,
    covers_fail: Arc<RwLock<bool>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<SourceError>>>,
    fetched_pages: Arc<RwLock<Vec<u32>>>,
    queries: Arc<RwLock<Vec<ListQuery>>>,
    cover_requests: Arc<RwLock<Vec<String>>>,
}

impl Default for MockMovieSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMovieSource {
    pub fn new() -> Self {
        Self {
            count: Arc::new(RwLock::new(0)),
            pages: Arc::new(RwLock::new(HashMap::new())),
            failing_pages: Arc::new(RwLock::new(HashSet::new())),
            cover: Arc::new(RwLock::new(Vec::new())),
            covers_fail: Arc::new(RwLock::new(false)),
            next_error: Arc::new(RwLock::new(None)),
            fetched_pages: Arc::new(RwLock::new(Vec::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            cover_requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Total reported by `movie_count`.
    pub async fn set_count(&self, count: u64) {
        *self.count.write().await = count;
    }

    pub async fn set_page(&self, page: u32, movies: Vec<Movie>) {
        self.pages.write().await.insert(page, movies);
    }

    /// Make every fetch of `page` fail as if retries ran out.
    pub async fn fail_page(&self, page: u32) {
        self.failing_pages.write().await.insert(page);
    }

    pub async fn set_cover(&self, bytes: Vec<u8>) {
        *self.cover.write().await = bytes;
    }

    pub async fn fail_covers(&self, fail: bool) {
        *self.covers_fail.write().await = fail;
    }

    /// Set an error to be returned on the next operation.
    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Pages requested so far, in request order.
    pub async fn fetched_pages(&self) -> Vec<u32> {
        self.fetched_pages.read().await.clone()
    }

    /// Queries seen by `movie_count` and `fetch_page`.
    pub async fn queries(&self) -> Vec<ListQuery> {
        self.queries.read().await.clone()
    }

    pub async fn cover_requests(&self) -> Vec<String> {
        self.cover_requests.read().await.clone()
    }

    async fn take_error(&self) -> Result<(), SourceError> {
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MovieSource for MockMovieSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn movie_count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        self.take_error().await?;
        self.queries.write().await.push(query.clone());
        Ok(*self.count.read().await)
    }

    async fn fetch_page(&self, query: &ListQuery, page: u32) -> Result<Vec<Movie>, SourceError> {
        self.fetched_pages.write().await.push(page);
        self.queries.write().await.push(query.clone());
        self.take_error().await?;
        if self.failing_pages.read().await.contains(&page) {
            return Err(SourceError::ConnectionFailed(format!(
                "page {} unreachable",
                page
            )));
        }
        Ok(self.pages.read().await.get(&page).cloned().unwrap_or_default())
    }

    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        self.cover_requests.write().await.push(url.to_string());
        self.take_error().await?;
        if *self.covers_fail.read().await {
            return Err(SourceError::Http { status: 404 });
        }
        Ok(self.cover.read().await.clone())
    }
}
