//! Instant-availability response parsing.
//!
//! Two shapes are accepted per hash: a map of variant id to
//! `{"files": [{"filename", "filesize"}]}`, and the service's native
//! `{"rd": [{"<file id>": {"filename", "filesize"}}, ...]}` list of
//! variants. A variant is kept only if it contains a video file.

use serde_json::Value;

use super::{Availability, CachedFile, CachedVariant};

pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mkv", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v",
];

pub fn is_video_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Parse an instant-availability body into cached variants by lowercase hash.
pub fn parse_availability(body: &Value) -> Availability {
    let mut availability = Availability::new();
    let Some(by_hash) = body.as_object() else {
        return availability;
    };

    for (hash, info) in by_hash {
        let Some(groups) = info.as_object() else {
            continue;
        };
        let mut variants = Vec::new();
        for (group_id, group) in groups {
            match group {
                Value::Object(obj) => {
                    let files = obj
                        .get("files")
                        .and_then(Value::as_array)
                        .map(|files| files.iter().filter_map(parse_file).collect())
                        .unwrap_or_default();
                    variants.extend(variant(group_id.clone(), files));
                }
                Value::Array(list) => {
                    for (idx, entry) in list.iter().enumerate() {
                        let files = entry
                            .as_object()
                            .map(|obj| obj.values().filter_map(parse_file).collect())
                            .unwrap_or_default();
                        variants.extend(variant(format!("{}:{}", group_id, idx), files));
                    }
                }
                _ => {}
            }
        }
        if !variants.is_empty() {
            availability.insert(hash.to_lowercase(), variants);
        }
    }
    availability
}

fn parse_file(value: &Value) -> Option<CachedFile> {
    let obj = value.as_object()?;
    Some(CachedFile {
        filename: obj.get("filename")?.as_str()?.to_string(),
        filesize: obj.get("filesize").and_then(Value::as_u64).unwrap_or(0),
    })
}

fn variant(variant_id: String, files: Vec<CachedFile>) -> Option<CachedVariant> {
    let total_files = files.len();
    let video_files: Vec<CachedFile> = files
        .into_iter()
        .filter(|f| is_video_file(&f.filename))
        .collect();
    if video_files.is_empty() {
        return None;
    }
    Some(CachedVariant {
        variant_id,
        video_files,
        total_files,
    })
}
