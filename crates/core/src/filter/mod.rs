//! Release filtering.
//!
//! Decides which (release, torrent variant) pairs from a listing page are
//! worth persisting: year floor, in-run dedup, quality match, and the
//! cross-run cache check, with optional per-genre expansion.

mod release;
mod types;

pub use release::{normalize_quality, sanitize_name, ReleaseFilter};
pub use types::*;
