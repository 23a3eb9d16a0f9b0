//! YTS `list_movies` backend.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::pagination::PAGE_SIZE;
use super::retry::{random_user_agent, retry_with_backoff};
use super::{ListQuery, Movie, MovieSource, SourceError, YtsConfig};

/// Client for the YTS listing API.
pub struct YtsClient {
    client: Client,
    config: YtsConfig,
}

impl YtsClient {
    pub fn new(config: YtsConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build the listing URL for one page.
    fn build_list_url(&self, query: &ListQuery, page: u32) -> String {
        format!(
            "{}/list_movies.json?quality={}&genre={}&minimum_rating={}&sort_by={}&order_by={}&limit={}&page={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&query.quality),
            urlencoding::encode(&query.genre),
            query.minimum_rating,
            urlencoding::encode(&query.sort_by),
            urlencoding::encode(&query.order_by),
            PAGE_SIZE,
            page
        )
    }

    /// GET a listing page with retries; `None` when the body is not a listing.
    async fn get_listing(&self, url: &str) -> Result<Option<ListData>, SourceError> {
        let client = &self.client;
        let body = retry_with_backoff(&self.config.retry, "list_movies", move |_| async move {
            let response = client
                .get(url)
                .header(USER_AGENT, random_user_agent())
                .send()
                .await
                .map_err(SourceError::from_reqwest)?;

            if !response.status().is_success() {
                return Err(SourceError::Http {
                    status: response.status().as_u16(),
                });
            }

            response.text().await.map_err(SourceError::from_reqwest)
        })
        .await?;

        Ok(parse_listing(&body))
    }
}

/// Decode a listing body; logs and returns `None` if it is malformed.
fn parse_listing(body: &str) -> Option<ListData> {
    match serde_json::from_str::<ListResponse>(body) {
        Ok(response) => response.data,
        Err(e) => {
            warn!(error = %e, "Listing response could not be decoded");
            None
        }
    }
}

#[async_trait]
impl MovieSource for YtsClient {
    fn name(&self) -> &str {
        "yts"
    }

    async fn movie_count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        let url = self.build_list_url(query, 1);
        let count = self
            .get_listing(&url)
            .await?
            .and_then(|d| d.movie_count)
            .unwrap_or(0);
        debug!(count, "Listing movie count");
        Ok(count)
    }

    async fn fetch_page(&self, query: &ListQuery, page: u32) -> Result<Vec<Movie>, SourceError> {
        let url = self.build_list_url(query, page);
        let movies = self
            .get_listing(&url)
            .await?
            .and_then(|d| d.movies)
            .unwrap_or_default();
        debug!(page, movies = movies.len(), "Fetched listing page");
        Ok(movies)
    }

    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let client = &self.client;
        retry_with_backoff(&self.config.retry, "cover", move |_| async move {
            let response = client
                .get(url)
                .header(USER_AGENT, random_user_agent())
                .send()
                .await
                .map_err(SourceError::from_reqwest)?;

            if !response.status().is_success() {
                return Err(SourceError::Http {
                    status: response.status().as_u16(),
                });
            }

            let bytes = response.bytes().await.map_err(SourceError::from_reqwest)?;
            Ok(bytes.to_vec())
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Option<ListData>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    movie_count: Option<u64>,
    movies: Option<Vec<Movie>>,
}
