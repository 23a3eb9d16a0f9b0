//! Magnet descriptors and the on-disk queue between scrape and upload.
//!
//! A descriptor is an immutable JSON record with a `.magnet` extension.
//! The scrape run creates them; the upload run scans a directory tree for
//! them, newest first, and never modifies or deletes them.

mod queue;
mod types;

pub use queue::DescriptorQueue;
pub use types::*;
