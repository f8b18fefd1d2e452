//! Time-series export.

pub mod tsv_export;

pub use tsv_export::{CellRecord, ExportSet, GroupRecord, MembraneRecord};
