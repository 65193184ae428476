//! Custom error types for the application.
//!
//! Two error families live here:
//!
//! - **`DeviceFault`**: a transient failure reported by the stage or the sensor.
//!   Faults are plain data (`Clone + PartialEq`) so the retry combinator can hand
//!   them to callbacks and keep the last one for diagnostics. They never escape
//!   the scan runner; an exhausted fault becomes a skipped point instead.
//! - **`ScanError`**: everything that can stop the application, consolidated in
//!   one enum using `thiserror`:
//!   - **`Config`**: wraps errors from `figment` while reading the TOML file or
//!     environment overrides.
//!   - **`Configuration`**: semantic errors in values that parsed correctly
//!     (zero window size, zero steps, non-finite range bounds). These are raised
//!     before any device is touched.
//!   - **`Io`**: wraps `std::io::Error`.
//!   - **`Storage`**: CSV or heatmap output problems.
//!   - **`Logging`**: the tracing subscriber could not be installed.
//!   - **`FeatureNotEnabled`**: a storage backend was requested but not compiled in.
//!
//! By using `#[from]`, `ScanError` can be created from underlying error types with
//! the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, ScanError>;

/// A retryable failure reported by a device collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceFault {
    /// The stage did not reach the target in time.
    #[error("Stage timeout moving to ({x:.2},{y:.2})")]
    StageTimeout {
        /// Target x coordinate.
        x: f64,
        /// Target y coordinate.
        y: f64,
    },

    /// The sensor answered without a value.
    #[error("Received no value from the sensor")]
    NoReading,

    /// The sensor reported a read error.
    #[error("Sensor error: {0}")]
    SensorRead(String),
}

/// Errors that stop the application before or after a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Reading the configuration sources failed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// A configuration value is out of range.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Result output failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The tracing subscriber could not be installed.
    #[error("Logging setup error: {0}")]
    Logging(String),

    /// The requested backend was not compiled in.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanError::Configuration("rolling_window_size must be >= 1".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration validation error: rolling_window_size must be >= 1"
        );
    }

    #[test]
    fn test_stage_timeout_display() {
        let fault = DeviceFault::StageTimeout { x: 25.0, y: 50.0 };
        assert_eq!(fault.to_string(), "Stage timeout moving to (25.00,50.00)");
    }

    #[test]
    fn test_feature_not_enabled() {
        let err = ScanError::FeatureNotEnabled("storage_csv".into());
        assert!(err.to_string().contains("--features storage_csv"));
    }
}
