//! Heatmap reconstruction of a finished scan.
//!
//! Result rows are stored in path order, not grid order. The grid is rebuilt by
//! replaying the zig-zag rule: row `r` of the grid holds rows
//! `r * x_steps .. (r + 1) * x_steps` of the output, reversed when `r` is odd.

use crate::scan::{grid_index, ResultRow};
use anyhow::Result;
use std::path::Path;

/// Filtered values laid out on the scan grid. Failed points are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    x_steps: usize,
    y_steps: usize,
    cells: Vec<Option<f64>>,
}

impl Heatmap {
    /// Place `values`, given in path order, onto a `y_steps x x_steps` grid.
    ///
    /// Only the first `x_steps * y_steps` values are used; cells beyond the end
    /// of `values` stay empty. NaN counts as empty.
    pub fn from_values<I>(values: I, x_steps: usize, y_steps: usize) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut cells = vec![None; x_steps * y_steps];
        for (i, value) in values.into_iter().take(cells.len()).enumerate() {
            let (row, column) = grid_index(i, x_steps);
            cells[row * x_steps + column] = value.filter(|v| !v.is_nan());
        }
        Self {
            x_steps,
            y_steps,
            cells,
        }
    }

    /// Grid of the filtered values of `rows`.
    pub fn from_rows(rows: &[ResultRow], x_steps: usize, y_steps: usize) -> Self {
        Self::from_values(rows.iter().map(|r| r.filtered), x_steps, y_steps)
    }

    /// Read the `filtered_value` column of a results CSV.
    ///
    /// Anything after the first `x_steps * y_steps` data rows (such as the peak
    /// summary) is ignored, and blank or non-numeric cells become empty.
    #[cfg(feature = "storage_csv")]
    pub fn from_csv<P: AsRef<Path>>(path: P, x_steps: usize, y_steps: usize) -> Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open results CSV at {:?}", path))?;

        let mut values = Vec::with_capacity(x_steps * y_steps);
        for record in reader.records().take(x_steps * y_steps) {
            let record = record.context("Failed to read results CSV record")?;
            values.push(record.get(3).and_then(|v| v.trim().parse::<f64>().ok()));
        }
        Ok(Self::from_values(values, x_steps, y_steps))
    }

    /// Number of columns.
    pub fn x_steps(&self) -> usize {
        self.x_steps
    }

    /// Number of rows.
    pub fn y_steps(&self) -> usize {
        self.y_steps
    }

    /// Value at grid `row` (y index) and `column` (x index).
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.y_steps || column >= self.x_steps {
            return None;
        }
        self.cells[row * self.x_steps + column]
    }

    /// Smallest and largest value present, or `None` for an empty grid.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.cells.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Render as a PNG, `cell_px` pixels per grid cell.
    ///
    /// Values are mapped from white (minimum) to dark red (maximum); failed
    /// cells are black. Grid row 0 is drawn at the bottom of the image.
    #[cfg(feature = "heatmap_png")]
    pub fn save_png<P: AsRef<Path>>(&self, path: P, cell_px: u32) -> Result<()> {
        use anyhow::Context;
        use image::{ImageFormat, Rgb, RgbImage};

        let path = path.as_ref();
        if self.cells.is_empty() || cell_px == 0 {
            anyhow::bail!("Cannot render an empty heatmap to {:?}", path);
        }

        let width = u32::try_from(self.x_steps)?.saturating_mul(cell_px);
        let height = u32::try_from(self.y_steps)?.saturating_mul(cell_px);
        let range = self.value_range();

        let image = RgbImage::from_fn(width, height, |px, py| {
            let column = (px / cell_px) as usize;
            let row = self.y_steps - 1 - (py / cell_px) as usize;
            match (self.get(row, column), range) {
                (Some(value), Some((lo, hi))) => {
                    let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
                    Rgb(reds(t))
                }
                _ => Rgb([0, 0, 0]),
            }
        });

        super::storage::ensure_parent_dir(path)
            .with_context(|| format!("Failed to create output directory for {:?}", path))?;
        image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("Failed to write heatmap to {:?}", path))?;
        tracing::info!("Heatmap saved to '{}'.", path.display());
        Ok(())
    }
}

/// White-to-red colormap for `t` in [0, 1].
#[cfg(feature = "heatmap_png")]
fn reds(t: f64) -> [u8; 3] {
    const LOW: [f64; 3] = [255.0, 245.0, 240.0];
    const HIGH: [f64; 3] = [103.0, 0.0, 13.0];
    let t = t.clamp(0.0, 1.0);
    let mut rgb = [0u8; 3];
    for (channel, (lo, hi)) in rgb.iter_mut().zip(LOW.iter().zip(HIGH.iter())) {
        *channel = (lo + (hi - lo) * t).round() as u8;
    }
    rgb
}
