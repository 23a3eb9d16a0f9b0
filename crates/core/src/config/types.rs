use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::scrape::ScraperConfig;
use crate::source::YtsConfig;
use crate::upload::{UploadConfig, UploadPolicy};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: YtsConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// node-exporter textfile written at the end of each run.
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

/// Sanitized config for logging and display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub source: YtsConfig,
    pub scraper: ScraperConfig,
    pub cache: CacheConfig,
    pub upload: SanitizedUploadConfig,
    pub metrics: MetricsConfig,
}

/// Upload config with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUploadConfig {
    pub api_key_configured: bool,
    pub base_url: String,
    pub descriptor_dir: PathBuf,
    pub max_per_run: usize,
    pub max_cached_per_run: usize,
    pub cached_only: bool,
    pub cache_check_batch_size: usize,
    pub request_interval_ms: u64,
    pub timeout_secs: u32,
    pub max_active_downloads: usize,
    pub active_poll_interval_ms: u64,
    pub max_active_polls: u32,
    pub policy: UploadPolicy,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let upload = &config.upload;
        Self {
            source: config.source.clone(),
            scraper: config.scraper.clone(),
            cache: config.cache.clone(),
            upload: SanitizedUploadConfig {
                api_key_configured: !upload.api_key.is_empty(),
                base_url: upload.base_url.clone(),
                descriptor_dir: upload.descriptor_dir.clone(),
                max_per_run: upload.max_per_run,
                max_cached_per_run: upload.max_cached_per_run,
                cached_only: upload.cached_only,
                cache_check_batch_size: upload.cache_check_batch_size,
                request_interval_ms: upload.request_interval_ms,
                timeout_secs: upload.timeout_secs,
                max_active_downloads: upload.max_active_downloads,
                active_poll_interval_ms: upload.active_poll_interval_ms,
                max_active_polls: upload.max_active_polls,
                policy: upload.policy.clone(),
            },
            metrics: config.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CategorizeBy;
    use crate::upload::BackoffMode;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.base_url, "https://yts.mx/api/v2");
        assert_eq!(config.scraper.quality, "2160p");
        assert_eq!(config.cache.retention_days, 30);
        assert_eq!(config.upload.max_per_run, 20);
        assert!(config.metrics.textfile.is_none());
    }

    #[test]
    fn test_deserialize_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.scraper.start_page, 1);
        assert!(config.upload.api_key.is_empty());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
[source]
base_url = "http://localhost:9000/api/v2"
timeout_secs = 5

[source.retry]
max_attempts = 4

[scraper]
quality = "all"
categorize_by = "genre"
year_limit = 2010
output_dir = "/srv/magnets"

[cache]
path = "/srv/cache.json"
retention_days = 7

[upload]
api_key = "secret"
descriptor_dir = "/srv/magnets"
cached_only = true
max_active_downloads = 10

[upload.policy]
backoff = "fixed"
rate_limit_halt_threshold = 2

[metrics]
textfile = "/var/lib/node_exporter/harvester.prom"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.source.timeout_secs, 5);
        assert_eq!(config.source.retry.max_attempts, 4);
        assert_eq!(config.scraper.categorize_by, CategorizeBy::Genre);
        assert_eq!(config.cache.retention_days, 7);
        assert!(config.upload.cached_only);
        assert_eq!(config.upload.policy.backoff, BackoffMode::Fixed);
        assert_eq!(config.upload.policy.rate_limit_halt_threshold, 2);
        assert_eq!(
            config.metrics.textfile,
            Some(PathBuf::from("/var/lib/node_exporter/harvester.prom"))
        );
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let mut config = Config::default();
        config.upload.api_key = "super-secret-token".to_string();

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.upload.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret-token"));
        assert!(json.contains("api_key_configured"));
    }

    #[test]
    fn test_sanitized_config_without_api_key() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(!sanitized.upload.api_key_configured);
    }
}
