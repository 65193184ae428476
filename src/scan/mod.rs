//! Raster scan engine.
//!
//! This module turns a pair of axis ranges into a zig-zag path, drives the
//! stage and sensor through it one point at a time, smooths the readings with a
//! moving average and reports the peak.
//!
//! ## Components
//!
//! - **`path`**: pure generation of the ordered scan points.
//! - **`filter`**: fixed-window moving average over accepted readings.
//! - **`peak`**: maximum filtered value over the finished results.
//! - **`runner`**: the per-point move/measure protocol, with retries from
//!   [`crate::error_recovery`].
//!
//! ## Output contract
//!
//! `ScanReport::rows` always has exactly one row per scan point, in path order.
//! A point that could not be moved to or measured is still present, with both
//! `raw` and `filtered` set to `None`. Consumers such as the heatmap rebuild the
//! grid by replaying the zig-zag order, so rows must never be reordered.

pub mod filter;
pub mod path;
pub mod peak;
pub mod runner;

pub use filter::RollingAverage;
pub use path::{generate_scan_path, grid_index, ScanPoint, ScanRange};
pub use peak::{detect_peak, PeakRecord};
pub use runner::{PointOutcome, PointPhase, ScanRunner};

use serde::{Deserialize, Serialize};

/// One row of scan output.
///
/// `raw` and `filtered` are both `Some` for a measured point and both `None`
/// for a skipped one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// X coordinate of the point.
    pub x: i64,
    /// Y coordinate of the point.
    pub y: i64,
    /// Sensor reading.
    pub raw: Option<f64>,
    /// Moving average after this reading.
    pub filtered: Option<f64>,
}

impl ResultRow {
    /// Row for a point that was measured.
    pub fn measured(point: ScanPoint, raw: f64, filtered: f64) -> Self {
        Self {
            x: point.x,
            y: point.y,
            raw: Some(raw),
            filtered: Some(filtered),
        }
    }

    /// Row for a point that was skipped.
    pub fn skipped(point: ScanPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            raw: None,
            filtered: None,
        }
    }

    /// Coordinates of this row.
    pub fn point(&self) -> ScanPoint {
        ScanPoint::new(self.x, self.y)
    }

    /// True when the point failed.
    pub fn is_skipped(&self) -> bool {
        self.filtered.is_none()
    }
}

/// Complete output of one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// One row per scan point, in path order.
    pub rows: Vec<ResultRow>,
    /// Highest filtered value, if any point was measured.
    pub peak: Option<PeakRecord>,
    /// Points skipped because the stage move was exhausted.
    pub skipped_moves: usize,
    /// Points skipped because the measurement was exhausted.
    pub skipped_measurements: usize,
    /// Failed device attempts across the whole scan, including recovered ones.
    pub failed_attempts: usize,
}

impl ScanReport {
    /// Number of points with a reading.
    pub fn measured_points(&self) -> usize {
        self.rows.iter().filter(|row| !row.is_skipped()).count()
    }

    /// Number of points without a reading.
    pub fn skipped_points(&self) -> usize {
        self.skipped_moves + self.skipped_measurements
    }
}
