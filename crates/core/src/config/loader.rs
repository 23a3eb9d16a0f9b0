use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "harvester.toml";

/// Variables read by earlier deployments, mapped onto their config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("REAL_DEBRID_API_KEY", "upload.api_key"),
    ("TORRENT_DIR", "upload.descriptor_dir"),
    ("MAX_UPLOADS_PER_RUN", "upload.max_per_run"),
    ("MAX_CACHED_UPLOADS_PER_RUN", "upload.max_cached_per_run"),
];

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    extract(Figment::new().merge(Toml::file(path)))
}

/// Load `harvester.toml` if present, otherwise environment and defaults only
pub fn load_default_config() -> Result<Config, ConfigError> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        load_config(path)
    } else {
        extract(Figment::new())
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Layer the environment over `base`: legacy names first, `HARVESTER_` last.
fn extract(base: Figment) -> Result<Config, ConfigError> {
    base.merge(legacy_env())
        .merge(Env::prefixed("HARVESTER_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, target)| *target)
            .unwrap_or_default()
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[upload]
max_per_run = 5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.upload.max_per_run, 5);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[scraper]
start_page = "first"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/harvester.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[scraper]
quality = "1080p"

[cache]
retention_days = 14
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.scraper.quality, "1080p");
        assert_eq!(config.cache.retention_days, 14);
    }

    #[test]
    fn test_prefixed_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "[upload]\nmax_per_run = 5\n")?;
            jail.set_env("HARVESTER_UPLOAD__MAX_PER_RUN", "7");
            jail.set_env("HARVESTER_SCRAPER__CSV_ONLY", "true");

            let config = load_default_config().unwrap();
            assert_eq!(config.upload.max_per_run, 7);
            assert!(config.scraper.csv_only);
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_names() {
        Jail::expect_with(|jail| {
            jail.set_env("REAL_DEBRID_API_KEY", "legacy-token");
            jail.set_env("TORRENT_DIR", "/data/magnets");
            jail.set_env("MAX_UPLOADS_PER_RUN", "3");
            jail.set_env("MAX_CACHED_UPLOADS_PER_RUN", "50");

            let config = load_default_config().unwrap();
            assert_eq!(config.upload.api_key, "legacy-token");
            assert_eq!(config.upload.descriptor_dir, PathBuf::from("/data/magnets"));
            assert_eq!(config.upload.max_per_run, 3);
            assert_eq!(config.upload.max_cached_per_run, 50);
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_wins_over_legacy() {
        Jail::expect_with(|jail| {
            jail.set_env("MAX_UPLOADS_PER_RUN", "3");
            jail.set_env("HARVESTER_UPLOAD__MAX_PER_RUN", "9");

            let config = load_default_config().unwrap();
            assert_eq!(config.upload.max_per_run, 9);
            Ok(())
        });
    }
}
