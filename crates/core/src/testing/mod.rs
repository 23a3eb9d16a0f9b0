//! Testing utilities and mock implementations.
//!
//! Mocks for the two remote services (listing source and debrid service)
//! so scrape and upload runs can be exercised end to end against a temp
//! directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvester_core::testing::{fixtures, MockDebridClient, MockMovieSource};
//!
//! let source = MockMovieSource::new();
//! source.set_count(10).await;
//! source.set_page(1, vec![fixtures::movie(1, "Heat", 1995, &["2160p"])]).await;
//!
//! let client = MockDebridClient::new();
//! client.push_add_error(fixtures::rate_limited()).await;
//! ```

mod mock_debrid;
mod mock_source;

pub use mock_debrid::MockDebridClient;
pub use mock_source::MockMovieSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime};

    use crate::debrid::DebridError;
    use crate::descriptor::MagnetDescriptor;
    use crate::filter::{sanitize_name, Candidate};
    use crate::source::{Movie, TorrentVariant};

    /// Deterministic 40-character hex info hash for a (release, quality) pair.
    pub fn hash_for(id: u64, quality: &str) -> String {
        let q = quality
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        format!("{:020x}{:020x}", id, q)
    }

    /// A listing with one torrent per quality and no genres or IMDb id.
    pub fn movie(id: u64, title: &str, year: u32, qualities: &[&str]) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            title_long: format!("{} ({})", title, year),
            year,
            rating: 7.0,
            genres: None,
            language: Some("en".to_string()),
            url: Some(format!(
                "https://yts.mx/movies/{}-{}",
                title.to_lowercase().replace(' ', "-"),
                year
            )),
            imdb_code: None,
            large_cover_image: None,
            torrents: Some(
                qualities
                    .iter()
                    .map(|q| TorrentVariant {
                        quality: q.to_string(),
                        url: Some(format!("https://yts.mx/torrent/download/{}", hash_for(id, q))),
                        hash: hash_for(id, q),
                    })
                    .collect(),
            ),
        }
    }

    /// An accepted candidate for a 2020 release.
    pub fn candidate(id: u64, title: &str, quality: &str) -> Candidate {
        let listing = movie(id, title, 2020, &[quality]);
        Candidate {
            release_id: id.to_string(),
            title: title.to_string(),
            display_name: sanitize_name(&listing.title_long),
            year: 2020,
            quality: quality.to_string(),
            hash: hash_for(id, quality),
            torrent_url: listing.torrents.and_then(|t| t.into_iter().next()?.url),
            imdb_code: None,
            genre: None,
            cover_url: None,
            rating: listing.rating,
            language: listing.language,
            url: listing.url,
        }
    }

    pub fn descriptor(hash: &str, movie_name: &str, quality: &str) -> MagnetDescriptor {
        MagnetDescriptor::new(hash, movie_name, 2024, quality, None, "1")
    }

    /// Write `descriptor` to `dir/name` with an mtime `age_rank` seconds
    /// after a fixed epoch. Higher ranks are newer.
    pub fn write_descriptor(
        dir: &Path,
        name: &str,
        descriptor: &MagnetDescriptor,
        age_rank: u64,
    ) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create descriptor dir");
        }
        let body = serde_json::to_vec_pretty(descriptor).expect("serialize descriptor");
        std::fs::write(&path, body).expect("write descriptor");
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000 + age_rank);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(modified))
            .expect("set descriptor mtime");
        path
    }

    /// "Too many requests" as the debrid service reports it.
    pub fn rate_limited() -> DebridError {
        DebridError::Api {
            status: 429,
            code: Some(34),
            message: "too_many_requests".to_string(),
        }
    }

    /// "Too many active downloads" quota error.
    pub fn quota_exceeded() -> DebridError {
        DebridError::Api {
            status: 509,
            code: Some(21),
            message: "too_many_active_downloads".to_string(),
        }
    }
}
