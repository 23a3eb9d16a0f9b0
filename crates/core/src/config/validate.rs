use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Scraper start page and worker count are not 0
/// - Upload batch size, retry attempts and per-run caps are not 0
/// - Listing retry attempts are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let checks: [(bool, &str); 7] = [
        (config.scraper.start_page == 0, "scraper.start_page cannot be 0"),
        (
            config.scraper.parallel_workers == 0,
            "scraper.parallel_workers cannot be 0",
        ),
        (
            config.upload.cache_check_batch_size == 0,
            "upload.cache_check_batch_size cannot be 0",
        ),
        (
            config.upload.policy.max_attempts == 0,
            "upload.policy.max_attempts cannot be 0",
        ),
        (config.upload.max_per_run == 0, "upload.max_per_run cannot be 0"),
        (
            config.upload.max_cached_per_run == 0,
            "upload.max_cached_per_run cannot be 0",
        ),
        (
            config.source.retry.max_attempts == 0,
            "source.retry.max_attempts cannot be 0",
        ),
    ];

    match checks.iter().find(|(failed, _)| *failed) {
        Some((_, message)) => Err(ConfigError::ValidationError(message.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_start_page_zero_fails() {
        let mut config = Config::default();
        config.scraper.start_page = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("start_page")));
    }

    #[test]
    fn test_validate_zero_batch_size_fails() {
        let mut config = Config::default();
        config.upload.cache_check_batch_size = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = Config::default();
        config.scraper.parallel_workers = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = Config::default();
        config.upload.policy.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }
}
