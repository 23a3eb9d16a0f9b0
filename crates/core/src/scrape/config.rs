//! Scraper configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::filter::{normalize_quality, CategorizeBy, FilterSettings};
use crate::persister::PersisterSettings;
use crate::source::ListQuery;

/// Configuration for a scrape run.
///
/// Defaults match the scheduled 2160p profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Quality to keep ("all", "720p", "1080p", "2160p", "3d").
    #[serde(default = "default_quality")]
    pub quality: String,

    #[serde(default = "default_genre")]
    pub genre: String,

    /// Minimum IMDb rating (0-9).
    #[serde(default)]
    pub minimum_rating: u8,

    /// "latest" for newest first, otherwise a listing sort field.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    #[serde(default)]
    pub categorize_by: CategorizeBy,

    /// Releases before this year are skipped (0 = no floor).
    #[serde(default)]
    pub year_limit: u32,

    /// First listing page to fetch (1-based).
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    /// Root of the descriptor tree.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Save the cover image next to each new descriptor.
    #[serde(default = "default_true")]
    pub posters: bool,

    /// Append the IMDb id to descriptor file names.
    #[serde(default = "default_true")]
    pub append_imdb_id: bool,

    /// Write descriptors of one page concurrently.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,

    /// Write CSV rows only: no descriptors, no cache updates.
    #[serde(default)]
    pub csv_only: bool,

    /// Also write CSV rows alongside descriptors.
    #[serde(default)]
    pub export_csv: bool,

    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// Keep going after a long streak of existing descriptors without asking.
    #[serde(default)]
    pub auto_continue: bool,

    /// Consecutive existing descriptors tolerated before asking.
    #[serde(default = "default_streak_limit")]
    pub existing_streak_limit: u32,
}

fn default_quality() -> String {
    "2160p".to_string()
}

fn default_genre() -> String {
    "all".to_string()
}

fn default_sort_by() -> String {
    "latest".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Downloads/2160p_Movies")
}

fn default_true() -> bool {
    true
}

fn default_parallel_workers() -> usize {
    4
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("YTS-Scraper.csv")
}

fn default_streak_limit() -> u32 {
    10
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            genre: default_genre(),
            minimum_rating: 0,
            sort_by: default_sort_by(),
            categorize_by: CategorizeBy::default(),
            year_limit: 0,
            start_page: default_start_page(),
            output_dir: default_output_dir(),
            posters: true,
            append_imdb_id: true,
            parallel: false,
            parallel_workers: default_parallel_workers(),
            csv_only: false,
            export_csv: false,
            csv_path: default_csv_path(),
            auto_continue: false,
            existing_streak_limit: default_streak_limit(),
        }
    }
}

impl ScraperConfig {
    /// Listing query for every page of this run.
    ///
    /// "latest" becomes `date_added` descending; any other sort is ascending.
    pub fn list_query(&self) -> ListQuery {
        let (sort_by, order_by) = if self.sort_by == "latest" {
            ("date_added".to_string(), "desc")
        } else {
            (self.sort_by.clone(), "asc")
        };
        ListQuery {
            quality: normalize_quality(&self.quality),
            genre: self.genre.clone(),
            minimum_rating: self.minimum_rating,
            sort_by,
            order_by: order_by.to_string(),
        }
    }

    pub fn filter_settings(&self) -> FilterSettings {
        FilterSettings {
            quality: self.quality.clone(),
            year_limit: self.year_limit,
            categorize_by: self.categorize_by,
        }
    }

    pub fn persister_settings(&self) -> PersisterSettings {
        PersisterSettings {
            output_dir: self.output_dir.clone(),
            posters: self.posters,
            append_imdb_id: self.append_imdb_id,
        }
    }

    /// Whether CSV rows are written this run.
    pub fn writes_csv(&self) -> bool {
        self.csv_only || self.export_csv
    }

    /// Descriptor writes in flight at once.
    pub fn write_concurrency(&self) -> usize {
        if self.parallel {
            self.parallel_workers.max(1)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScraperConfig::default();
        assert_eq!(config.quality, "2160p");
        assert_eq!(config.start_page, 1);
        assert_eq!(config.output_dir, PathBuf::from("Downloads/2160p_Movies"));
        assert!(config.posters);
        assert!(config.append_imdb_id);
        assert!(!config.auto_continue);
        assert_eq!(config.existing_streak_limit, 10);
        assert_eq!(config.write_concurrency(), 1);
    }

    #[test]
    fn test_latest_sorts_newest_first() {
        let query = ScraperConfig::default().list_query();
        assert_eq!(query.sort_by, "date_added");
        assert_eq!(query.order_by, "desc");
    }

    #[test]
    fn test_other_sort_is_ascending() {
        let config = ScraperConfig {
            sort_by: "rating".into(),
            ..Default::default()
        };
        let query = config.list_query();
        assert_eq!(query.sort_by, "rating");
        assert_eq!(query.order_by, "asc");
    }

    #[test]
    fn test_3d_quality_is_normalized() {
        let config = ScraperConfig {
            quality: "3d".into(),
            ..Default::default()
        };
        assert_eq!(config.list_query().quality, "3D");
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: ScraperConfig = toml::from_str("").unwrap();
        assert_eq!(config.genre, "all");
        assert_eq!(config.csv_path, PathBuf::from("YTS-Scraper.csv"));
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            quality = "1080p"
            genre = "horror"
            minimum_rating = 6
            sort_by = "year"
            categorize_by = "genre"
            year_limit = 2000
            start_page = 3
            output_dir = "/data/magnets"
            posters = false
            append_imdb_id = false
            parallel = true
            parallel_workers = 8
            csv_only = true
            csv_path = "/data/out.csv"
            auto_continue = true
            existing_streak_limit = 25
        "#;
        let config: ScraperConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.categorize_by, CategorizeBy::Genre);
        assert_eq!(config.start_page, 3);
        assert_eq!(config.write_concurrency(), 8);
        assert!(config.writes_csv());
        assert_eq!(config.existing_streak_limit, 25);
    }
}
