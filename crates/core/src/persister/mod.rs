//! Magnet descriptor persistence.
//!
//! Turns accepted candidates into `.magnet` descriptor files at
//! deterministic paths, never overwriting an existing one, and tracks
//! runs of "already exists" outcomes so a caught-up scrape can stop early.

mod escape;
mod magnet;
mod types;
mod writer;

pub use escape::{AutoContinue, ContinueDecider, EscapeHatch, HatchDecision};
pub use magnet::{build_path, magnet_uri, TRACKERS};
pub(crate) use magnet::{hash_from_magnet, DESCRIPTOR_EXT};
pub use types::*;
pub use writer::MagnetPersister;
pub(crate) use writer::record;
