//! Scan orchestration.
//!
//! Each point goes through `Pending -> Moving -> Measuring -> Recorded`. An
//! exhausted move or measurement jumps straight to `Recorded` with an empty
//! row; the scan itself never aborts once it has started. Points are handled
//! strictly one after another, and the runner takes `&mut self` for the whole
//! scan so nothing else can drive the devices meanwhile.

use super::{
    detect_peak, generate_scan_path, ResultRow, RollingAverage, ScanPoint, ScanRange, ScanReport,
};
use crate::config::ScanConfig;
use crate::error::{AppResult, DeviceFault};
use crate::error_recovery::{retry_with_backoff, DeviceOperation, RetryOutcome, RetryPolicy};
use crate::hardware::{Sensor, Stage};
use std::time::Duration;
use tracing::Instrument;

/// Where a point's protocol stopped when it was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointPhase {
    /// The stage move was exhausted.
    Moving,
    /// The measurement was exhausted.
    Measuring,
}

/// How a single point ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointOutcome {
    /// The point was measured and the reading entered the moving average.
    Measured {
        /// Sensor reading.
        raw: f64,
        /// Moving average including this reading.
        filtered: f64,
    },
    /// Retries ran out during `phase`; no reading was taken.
    Skipped {
        /// Phase that failed.
        phase: PointPhase,
    },
}

impl PointOutcome {
    /// Result row for this outcome at `point`.
    pub fn into_row(self, point: ScanPoint) -> ResultRow {
        match self {
            PointOutcome::Measured { raw, filtered } => ResultRow::measured(point, raw, filtered),
            PointOutcome::Skipped { .. } => ResultRow::skipped(point),
        }
    }
}

/// Drives a stage and a sensor through a raster scan.
///
/// # Example
///
/// ```rust,ignore
/// let mut runner = ScanRunner::new(stage, sensor);
/// let report = runner
///     .perform_scan(&ScanRange::new(0.0, 50.0, 3), &ScanRange::new(0.0, 50.0, 3), 3, 3)
///     .await?;
/// ```
pub struct ScanRunner<S, M> {
    stage: S,
    sensor: M,
    backoff_delay: Duration,
}

impl<S: Stage, M: Sensor> ScanRunner<S, M> {
    /// Take ownership of the devices for scanning.
    pub fn new(stage: S, sensor: M) -> Self {
        Self {
            stage,
            sensor,
            backoff_delay: RetryPolicy::default().backoff_delay,
        }
    }

    /// Back-off between failed attempts for [`ScanRunner::perform_scan`].
    pub fn with_backoff(mut self, backoff_delay: Duration) -> Self {
        self.backoff_delay = backoff_delay;
        self
    }

    /// Give the devices back.
    pub fn into_devices(self) -> (S, M) {
        (self.stage, self.sensor)
    }

    /// Scan the raster described by the two ranges.
    ///
    /// `max_retries` bounds the attempts for every move and every measurement;
    /// `window_size` is the moving-average length.
    ///
    /// # Errors
    ///
    /// Only configuration errors, raised before any device call: zero steps,
    /// non-finite bounds, zero retries or a zero window.
    pub async fn perform_scan(
        &mut self,
        x_range: &ScanRange,
        y_range: &ScanRange,
        max_retries: u32,
        window_size: usize,
    ) -> AppResult<ScanReport> {
        let config = ScanConfig {
            x_range: *x_range,
            y_range: *y_range,
            max_retries,
            rolling_window_size: window_size,
            retry_delay_ms: u64::try_from(self.backoff_delay.as_millis()).unwrap_or(u64::MAX),
        };
        self.run(&config).await
    }

    /// Scan using the `[scan]` configuration section, including its back-off.
    pub async fn run(&mut self, config: &ScanConfig) -> AppResult<ScanReport> {
        config.validate()?;
        let policy = config.retry_policy();
        let filter = RollingAverage::new(config.rolling_window_size)?;
        let path = generate_scan_path(&config.x_range, &config.y_range);

        let span = tracing::info_span!("scan", points = path.len());
        Ok(self.scan_path(path, &policy, filter).instrument(span).await)
    }

    async fn scan_path(
        &mut self,
        path: Vec<ScanPoint>,
        policy: &RetryPolicy,
        mut filter: RollingAverage,
    ) -> ScanReport {
        tracing::info!(
            points = path.len(),
            max_retries = policy.max_attempts,
            window = filter.window_size(),
            "Scan started"
        );

        let mut report = ScanReport {
            rows: Vec::with_capacity(path.len()),
            ..ScanReport::default()
        };

        for point in path {
            let outcome = self
                .scan_point(point, policy, &mut filter, &mut report.failed_attempts)
                .instrument(tracing::info_span!("point", x = point.x, y = point.y))
                .await;

            match outcome {
                PointOutcome::Measured { raw, filtered } => {
                    tracing::info!(
                        x = point.x,
                        y = point.y,
                        raw,
                        filtered,
                        "Point ({}, {}) - Raw: {}, Filtered: {}",
                        point.x,
                        point.y,
                        raw,
                        filtered
                    );
                }
                PointOutcome::Skipped { phase } => {
                    let reason = match phase {
                        PointPhase::Moving => {
                            report.skipped_moves += 1;
                            "move"
                        }
                        PointPhase::Measuring => {
                            report.skipped_measurements += 1;
                            "measure"
                        }
                    };
                    tracing::warn!(
                        x = point.x,
                        y = point.y,
                        "Skipping point ({}, {}) due to {} failure",
                        point.x,
                        point.y,
                        reason
                    );
                }
            }
            report.rows.push(outcome.into_row(point));
        }

        report.peak = detect_peak(&report.rows);
        match report.peak {
            Some(peak) => tracing::info!(
                value = peak.value,
                x = peak.x,
                y = peak.y,
                "Detected peak value is {} at ({}, {})",
                peak.value,
                peak.x,
                peak.y
            ),
            None => tracing::warn!("No valid data to compute peak"),
        }

        tracing::info!(
            measured = report.measured_points(),
            skipped = report.skipped_points(),
            failed_attempts = report.failed_attempts,
            "Scan complete"
        );
        report
    }

    /// Move to `point`, measure, and feed the reading into the filter.
    async fn scan_point(
        &self,
        point: ScanPoint,
        policy: &RetryPolicy,
        filter: &mut RollingAverage,
        failed_attempts: &mut usize,
    ) -> PointOutcome {
        let stage = &self.stage;
        let sensor = &self.sensor;
        let (x, y) = (point.x as f64, point.y as f64);

        let moved = retry_with_backoff(
            DeviceOperation::Move,
            policy,
            move || stage.move_to(x, y),
            |_, _| *failed_attempts += 1,
        )
        .await;
        if moved.is_exhausted() {
            return PointOutcome::Skipped {
                phase: PointPhase::Moving,
            };
        }

        let measured = retry_with_backoff(
            DeviceOperation::Measure,
            policy,
            move || async move {
                sensor
                    .measure()
                    .await
                    .and_then(|reading| reading.ok_or(DeviceFault::NoReading))
            },
            |_, _| *failed_attempts += 1,
        )
        .await;

        match measured {
            RetryOutcome::Succeeded { value: raw, .. } => PointOutcome::Measured {
                raw,
                filtered: filter.push(raw),
            },
            RetryOutcome::Exhausted { .. } => PointOutcome::Skipped {
                phase: PointPhase::Measuring,
            },
        }
    }
}
