//! Peak detection over finished scan results.

use super::ResultRow;
use serde::{Deserialize, Serialize};

/// The point with the greatest filtered reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    /// Filtered value at the peak.
    pub value: f64,
    /// X coordinate of the peak.
    pub x: i64,
    /// Y coordinate of the peak.
    pub y: i64,
}

/// Find the row with the largest filtered value.
///
/// Rows without a filtered value are ignored. Ties keep the earliest row in
/// scan order. Returns `None` when no point was measured.
pub fn detect_peak(rows: &[ResultRow]) -> Option<PeakRecord> {
    let mut peak: Option<PeakRecord> = None;
    for row in rows {
        let Some(value) = row.filtered else {
            continue;
        };
        if peak.map_or(true, |p| value > p.value) {
            peak = Some(PeakRecord {
                value,
                x: row.x,
                y: row.y,
            });
        }
    }
    peak
}
