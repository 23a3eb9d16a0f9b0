pub mod cache;
pub mod config;
pub mod debrid;
pub mod descriptor;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod persister;
pub mod scrape;
pub mod source;
pub mod testing;
pub mod upload;

pub use cache::{CacheConfig, CacheError, PersistentCache, ReleaseCacheEntry};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
    MetricsConfig, SanitizedConfig, DEFAULT_CONFIG_FILE,
};
pub use debrid::{DebridClient, DebridConfig, DebridError, RealDebridClient, UserInfo};
pub use descriptor::{DescriptorQueue, MagnetDescriptor, QueueError};
pub use export::{CsvExporter, ExportError};
pub use filter::{CategorizeBy, Candidate, FilterSettings, Rejection, ReleaseFilter};
pub use persister::{
    build_path, magnet_uri, AutoContinue, ContinueDecider, EscapeHatch, MagnetPersister,
    PersistError, PersisterSettings, WriteOutcome,
};
pub use scrape::{ScrapeError, ScrapeRunner, ScrapeSummary, ScraperConfig};
pub use source::{ListQuery, Movie, MovieSource, SourceError, YtsClient, YtsConfig};
pub use upload::{
    HaltReason, UploadConfig, UploadError, UploadOrchestrator, UploadOutcome, UploadPolicy,
    UploadSummary,
};
