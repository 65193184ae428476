//! Scan output: CSV persistence and heatmap rendering.

pub mod heatmap;
pub mod storage;

pub use heatmap::Heatmap;
pub use storage::{write_report, CsvWriter, StorageWriter};
