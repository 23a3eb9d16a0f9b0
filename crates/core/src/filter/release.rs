//! Per-release accept/reject decisions.

use std::collections::HashSet;

use crate::cache::PersistentCache;
use crate::source::{Movie, TorrentVariant};

use super::{Candidate, CategorizeBy, Evaluation, FilterSettings, Rejection, NO_GENRE};

/// Characters removed from names before they become path components.
const ILLEGAL_NAME_CHARS: &[char] = &['\'', '/', '\\', ':', '*', '?', '<', '>', '|'];

/// Strip characters that are illegal in file and directory names.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL_NAME_CHARS.contains(c))
        .collect()
}

/// Canonical form of a configured quality label (`3d` is listed as `3D`).
pub fn normalize_quality(quality: &str) -> String {
    if quality.eq_ignore_ascii_case("3d") {
        "3D".to_string()
    } else {
        quality.to_string()
    }
}

/// Filters listing entries against the year floor, quality, the in-run
/// seen set and the persistent cache.
pub struct ReleaseFilter {
    settings: FilterSettings,
    seen: HashSet<String>,
}

impl ReleaseFilter {
    pub fn new(settings: FilterSettings) -> Self {
        let settings = FilterSettings {
            quality: normalize_quality(&settings.quality),
            ..settings
        };
        Self {
            settings,
            seen: HashSet::new(),
        }
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Release-level rules: year floor, seen this run, has torrents.
    fn check_release(&self, movie: &Movie) -> Result<(), Rejection> {
        if movie.year < self.settings.year_limit {
            return Err(Rejection::BelowYearFloor {
                year: movie.year,
                floor: self.settings.year_limit,
            });
        }
        if self.seen.contains(&movie.release_id()) {
            return Err(Rejection::SeenThisRun);
        }
        match &movie.torrents {
            Some(torrents) if !torrents.is_empty() => Ok(()),
            _ => Err(Rejection::NoTorrents),
        }
    }

    /// Variant-level rules: quality match, then the cache.
    fn check_variant(
        &self,
        movie: &Movie,
        variant: &TorrentVariant,
        cache: &PersistentCache,
    ) -> Result<(), Rejection> {
        if self.settings.quality != "all" && self.settings.quality != variant.quality {
            return Err(Rejection::QualityMismatch {
                quality: variant.quality.clone(),
            });
        }
        if cache.contains(&movie.release_id(), &variant.quality) {
            return Err(Rejection::AlreadyCached {
                quality: variant.quality.clone(),
            });
        }
        Ok(())
    }

    /// Run every rule for one (release, variant) pair.
    pub fn evaluate(
        &self,
        movie: &Movie,
        variant: &TorrentVariant,
        cache: &PersistentCache,
    ) -> Result<(), Rejection> {
        self.check_release(movie)?;
        self.check_variant(movie, variant, cache)
    }

    /// Whether a (release, variant) pair should be persisted.
    pub fn accept(&self, movie: &Movie, variant: &TorrentVariant, cache: &PersistentCache) -> bool {
        self.evaluate(movie, variant, cache).is_ok()
    }

    /// All accepted outputs for a release, one per variant or per
    /// (variant, genre) when categorizing by genre.
    pub fn candidates(&self, movie: &Movie, cache: &PersistentCache) -> Evaluation {
        let mut evaluation = Evaluation::default();

        if let Err(rejection) = self.check_release(movie) {
            evaluation.rejections.push(rejection);
            return evaluation;
        }

        let display_name = sanitize_name(&movie.long_title());
        let genres: Vec<String> = match &movie.genres {
            Some(genres) if !genres.is_empty() => genres.clone(),
            _ => vec![NO_GENRE.to_string()],
        };

        for variant in movie.torrents.iter().flatten() {
            if let Err(rejection) = self.check_variant(movie, variant, cache) {
                evaluation.rejections.push(rejection);
                continue;
            }

            let make = |genre: Option<String>| Candidate {
                release_id: movie.release_id(),
                title: movie.title.clone(),
                display_name: display_name.clone(),
                year: movie.year,
                quality: variant.quality.clone(),
                hash: variant.hash.clone(),
                torrent_url: variant.url.clone(),
                imdb_code: movie.imdb_code.clone(),
                genre,
                cover_url: movie.large_cover_image.clone(),
                rating: movie.rating,
                language: movie.language.clone(),
                url: movie.url.clone(),
            };

            match self.settings.categorize_by {
                CategorizeBy::None => evaluation.accepted.push(make(None)),
                CategorizeBy::Genre => evaluation
                    .accepted
                    .extend(genres.iter().map(|g| make(Some(g.clone())))),
            }
        }

        evaluation
    }

    /// Remember a release so later pages skip it.
    pub fn mark_seen(&mut self, release_id: &str) {
        self.seen.insert(release_id.to_string());
    }

    pub fn is_seen(&self, release_id: &str) -> bool {
        self.seen.contains(release_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn filter(quality: &str, year_limit: u32) -> ReleaseFilter {
        ReleaseFilter::new(FilterSettings {
            quality: quality.to_string(),
            year_limit,
            categorize_by: CategorizeBy::None,
        })
    }

    fn cache() -> PersistentCache {
        PersistentCache::empty("unused.json")
    }

    #[test]
    fn test_sanitize_name_strips_illegal_chars() {
        assert_eq!(
            sanitize_name("Who's Afraid: A/B\\C*D?E<F>G|H (2020)"),
            "Whos Afraid ABCDEFGH (2020)"
        );
        assert_eq!(sanitize_name("Heat (1995)"), "Heat (1995)");
    }

    #[test]
    fn test_normalize_quality() {
        assert_eq!(normalize_quality("3d"), "3D");
        assert_eq!(normalize_quality("3D"), "3D");
        assert_eq!(normalize_quality("2160p"), "2160p");
        assert_eq!(normalize_quality("all"), "all");
    }

    #[test]
    fn test_year_floor_rejects_every_variant() {
        let f = filter("all", 2000);
        let movie = fixtures::movie(1, "Old", 1999, &["720p", "1080p"]);
        let evaluation = f.candidates(&movie, &cache());

        assert!(evaluation.is_empty());
        assert_eq!(
            evaluation.rejections,
            vec![Rejection::BelowYearFloor {
                year: 1999,
                floor: 2000
            }]
        );
        let variant = &movie.torrents.as_ref().unwrap()[0];
        assert!(!f.accept(&movie, variant, &cache()));
    }

    #[test]
    fn test_year_floor_is_inclusive() {
        let f = filter("all", 2000);
        let movie = fixtures::movie(1, "Edge", 2000, &["1080p"]);
        assert_eq!(f.candidates(&movie, &cache()).accepted.len(), 1);
    }

    #[test]
    fn test_no_torrents_rejected() {
        let f = filter("all", 0);
        let mut movie = fixtures::movie(1, "Bare", 2020, &[]);
        assert_eq!(
            f.candidates(&movie, &cache()).rejections,
            vec![Rejection::NoTorrents]
        );
        movie.torrents = None;
        assert_eq!(
            f.candidates(&movie, &cache()).rejections,
            vec![Rejection::NoTorrents]
        );
    }

    #[test]
    fn test_quality_filter() {
        let f = filter("2160p", 0);
        let movie = fixtures::movie(1, "Dune", 2021, &["1080p", "2160p"]);
        let evaluation = f.candidates(&movie, &cache());

        assert_eq!(evaluation.accepted.len(), 1);
        assert_eq!(evaluation.accepted[0].quality, "2160p");
        assert_eq!(
            evaluation.rejections,
            vec![Rejection::QualityMismatch {
                quality: "1080p".into()
            }]
        );
    }

    #[test]
    fn test_wildcard_accepts_all_qualities() {
        let f = filter("all", 0);
        let movie = fixtures::movie(1, "Dune", 2021, &["720p", "1080p", "2160p"]);
        assert_eq!(f.candidates(&movie, &cache()).accepted.len(), 3);
    }

    #[test]
    fn test_three_d_quality_matches_listing_label() {
        let f = filter("3d", 0);
        let movie = fixtures::movie(1, "Avatar", 2009, &["1080p", "3D"]);
        let evaluation = f.candidates(&movie, &cache());
        assert_eq!(evaluation.accepted.len(), 1);
        assert_eq!(evaluation.accepted[0].quality, "3D");
    }

    #[test]
    fn test_cached_variant_rejected() {
        let f = filter("all", 0);
        let mut cache = cache();
        cache.record("1", "Dune (2021)", 2021, "1080p");
        let movie = fixtures::movie(1, "Dune", 2021, &["1080p", "2160p"]);
        let evaluation = f.candidates(&movie, &cache);

        assert_eq!(evaluation.accepted.len(), 1);
        assert_eq!(evaluation.accepted[0].quality, "2160p");
        assert_eq!(
            evaluation.rejections,
            vec![Rejection::AlreadyCached {
                quality: "1080p".into()
            }]
        );
    }

    #[test]
    fn test_seen_release_rejected() {
        let mut f = filter("all", 0);
        let movie = fixtures::movie(5, "Repeat", 2020, &["1080p"]);
        assert_eq!(f.candidates(&movie, &cache()).accepted.len(), 1);

        f.mark_seen("5");
        assert!(f.is_seen("5"));
        assert_eq!(
            f.candidates(&movie, &cache()).rejections,
            vec![Rejection::SeenThisRun]
        );
    }

    #[test]
    fn test_genre_expansion() {
        let f = ReleaseFilter::new(FilterSettings {
            quality: "all".into(),
            year_limit: 0,
            categorize_by: CategorizeBy::Genre,
        });
        let mut movie = fixtures::movie(1, "Alien", 1979, &["720p", "1080p"]);
        movie.genres = Some(vec!["Horror".into(), "Sci-Fi".into()]);
        let evaluation = f.candidates(&movie, &cache());
        assert_eq!(evaluation.accepted.len(), 4);

        movie.genres = None;
        let evaluation = f.candidates(&movie, &cache());
        assert_eq!(evaluation.accepted.len(), 2);
        assert!(evaluation
            .accepted
            .iter()
            .all(|c| c.genre.as_deref() == Some(NO_GENRE)));
    }

    #[test]
    fn test_candidate_fields() {
        let f = filter("all", 0);
        let mut movie = fixtures::movie(9, "Who's: There?", 2022, &["2160p"]);
        movie.imdb_code = Some("tt123".into());
        let evaluation = f.candidates(&movie, &cache());
        let c = &evaluation.accepted[0];

        assert_eq!(c.release_id, "9");
        assert_eq!(c.display_name, "Whos There (2022)");
        assert_eq!(c.imdb_code.as_deref(), Some("tt123"));
        assert!(c.genre.is_none());
        assert_eq!(c.hash, fixtures::hash_for(9, "2160p"));
    }
}
