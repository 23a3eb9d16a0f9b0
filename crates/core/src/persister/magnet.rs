//! Path derivation and magnet URI construction.

use std::path::{Path, PathBuf};

use crate::filter::sanitize_name;

/// Trackers appended to every magnet URI, in order.
pub const TRACKERS: &[&str] = &[
    "udp://open.demonii.com:1337",
    "udp://tracker.openbittorrent.com:80",
    "udp://tracker.coppersurfer.tk:6969",
    "udp://glotorrents.pw:6969/announce",
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://torrent.gresille.org:80/announce",
    "udp://p4p.arenabg.com:1337",
    "udp://tracker.leechers-paradise.org:6969",
];

/// Descriptor file extension.
pub(crate) const DESCRIPTOR_EXT: &str = "magnet";

/// Derive the descriptor path for a release variant.
///
/// Layout is `<output>/<name> (<year>)/<name>.<quality>[-<external_id>].magnet`.
/// Illegal characters are stripped from `name`; the result depends only on
/// the arguments.
pub fn build_path(
    output_dir: &Path,
    name: &str,
    year: u32,
    quality: &str,
    external_id: Option<&str>,
) -> PathBuf {
    let name = sanitize_name(name);
    let dir = output_dir.join(format!("{} ({})", name, year));
    let file = match external_id {
        Some(id) => format!("{}.{}-{}.{}", name, quality, id, DESCRIPTOR_EXT),
        None => format!("{}.{}.{}", name, quality, DESCRIPTOR_EXT),
    };
    dir.join(file)
}

/// Build a magnet URI from an info hash and display name.
pub fn magnet_uri(hash: &str, name: &str) -> String {
    let mut uri = format!("magnet:?xt=urn:btih:{}&dn={}", hash, name.replace(' ', "+"));
    for tracker in TRACKERS {
        uri.push_str("&tr=");
        uri.push_str(tracker);
    }
    uri
}

/// Extract the info hash from a magnet URI.
pub(crate) fn hash_from_magnet(uri: &str) -> Option<&str> {
    uri.split(['?', '&'])
        .find_map(|part| part.strip_prefix("xt=urn:btih:"))
        .filter(|hash| !hash.is_empty())
}
