//! Core library for the rust_scan application.
//!
//! Drives a two-axis stage and a point sensor through a zig-zag raster,
//! retrying transient device faults, smoothing readings with a moving average
//! and reporting the strongest point. Results are written as CSV and can be
//! rendered as a heatmap.
//!
//! # Modules
//!
//! - [`scan`]: path generation, filtering, peak detection and the scan runner
//! - [`error_recovery`]: bounded retry with back-off for device operations
//! - [`hardware`]: device traits and simulated devices
//! - [`data`]: CSV output and heatmap rendering
//! - [`config`]: layered TOML and environment configuration
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod data;
pub mod error;
pub mod error_recovery;
pub mod hardware;
pub mod logging;
pub mod scan;

pub use error::{AppResult, DeviceFault, ScanError};
pub use scan::{ScanReport, ScanRunner};
