//! Debrid service abstraction.
//!
//! This module provides a `DebridClient` trait over the handful of
//! Real-Debrid endpoints the uploader needs, a request pacer that enforces a
//! minimum interval between calls, and instant-availability parsing.

mod availability;
mod config;
mod pacer;
mod real_debrid;
mod types;

pub use availability::{is_video_file, parse_availability, VIDEO_EXTENSIONS};
pub use config::DebridConfig;
pub use pacer::RequestPacer;
pub use real_debrid::RealDebridClient;
pub use types::*;
