//! CSV export of accepted releases.

mod types;
mod writer;

pub use types::*;
pub use writer::CsvExporter;
