//! Upload orchestration.
//!
//! Reads descriptors from the queue newest-first and submits them to the
//! debrid service under a per-run cap, with rate-limit aware retries,
//! an active-download ceiling, an optional instant-availability pre-filter,
//! and early termination once the service keeps refusing work.

mod config;
mod runner;
mod types;

pub use config::{BackoffMode, UploadConfig, UploadPolicy};
pub use runner::UploadOrchestrator;
pub use types::*;
