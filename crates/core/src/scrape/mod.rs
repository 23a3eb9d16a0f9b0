//! Scrape run.
//!
//! Walks the listing page by page, filters each release against the cache
//! and the in-run seen set, and hands accepted candidates to the persister
//! (or to the CSV exporter). The cache is written once, when the run ends.

mod config;
mod runner;
mod types;

pub use config::ScraperConfig;
pub use runner::ScrapeRunner;
pub use types::*;
