//! Raster path generation.
//!
//! The path visits every grid point row by row. Even rows run in increasing
//! x-index order, odd rows in decreasing order, so the stage never travels back
//! across the whole row between the end of one row and the start of the next.

use serde::{Deserialize, Serialize};

/// One axis of the raster: `steps` evenly spaced samples from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanRange {
    /// First sample.
    pub start: f64,
    /// Last sample (included when `steps >= 2`).
    pub end: f64,
    /// Number of samples.
    pub steps: usize,
}

impl ScanRange {
    /// Create a range.
    pub fn new(start: f64, end: f64, steps: usize) -> Self {
        Self { start, end, steps }
    }

    /// Integer sample positions along this axis.
    ///
    /// Samples are linearly interpolated and truncated toward zero. The final
    /// sample is pinned to `end` so rounding error cannot move it off the
    /// endpoint. `start > end` simply walks the axis backwards.
    pub fn samples(&self) -> Vec<i64> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![self.start as i64],
            steps => {
                let step = (self.end - self.start) / (steps - 1) as f64;
                (0..steps)
                    .map(|i| {
                        if i == steps - 1 {
                            self.end as i64
                        } else {
                            (self.start + step * i as f64) as i64
                        }
                    })
                    .collect()
            }
        }
    }
}

/// A stage target coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanPoint {
    /// X coordinate.
    pub x: i64,
    /// Y coordinate.
    pub y: i64,
}

impl ScanPoint {
    /// Create a point.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for ScanPoint {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

/// Generate the zig-zag scan path for the two axes.
///
/// The result has `x_range.steps * y_range.steps` points.
pub fn generate_scan_path(x_range: &ScanRange, y_range: &ScanRange) -> Vec<ScanPoint> {
    let x_values = x_range.samples();
    let y_values = y_range.samples();

    let mut points = Vec::with_capacity(x_values.len() * y_values.len());
    for (row, &y) in y_values.iter().enumerate() {
        if row % 2 == 0 {
            points.extend(x_values.iter().map(|&x| ScanPoint { x, y }));
        } else {
            points.extend(x_values.iter().rev().map(|&x| ScanPoint { x, y }));
        }
    }
    points
}

/// Index into a `y_steps x x_steps` grid for the `i`-th point of a zig-zag path.
///
/// Returns `(row, column)`. Consumers that only have the ordered result rows use
/// this to place each value back on the grid.
pub fn grid_index(i: usize, x_steps: usize) -> (usize, usize) {
    let row = i / x_steps;
    let offset = i % x_steps;
    let column = if row % 2 == 0 {
        offset
    } else {
        x_steps - 1 - offset
    };
    (row, column)
}
