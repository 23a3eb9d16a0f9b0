//! Movie listing source.
//!
//! This module provides a `MovieSource` trait for paginated movie listings
//! (YTS `list_movies`), the page-count arithmetic used to walk them, and the
//! retry/backoff policy shared by every listing request.

mod config;
mod pagination;
mod retry;
mod types;
mod yts;

pub use config::YtsConfig;
pub use pagination::{adjusted_movie_count, page_count, plan_pages, PAGE_SIZE};
pub use retry::{random_user_agent, retry_with_backoff, RetryPolicy};
pub use types::*;
pub use yts::YtsClient;
