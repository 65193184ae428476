//! Scan configuration using Figment
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Environment variables prefixed with `RUSTSCAN_`
//! 2. TOML configuration file (default: `config/scan.toml`)
//!
//! Nested keys in environment variables are separated by a double underscore,
//! because single underscores appear inside key names:
//!
//! ```text
//! RUSTSCAN_APPLICATION__LOG_LEVEL=debug
//! RUSTSCAN_SCAN__MAX_RETRIES=5
//! RUSTSCAN_SCAN__X_RANGE__STEPS=11
//! RUSTSCAN_OUTPUT__INCLUDE_PEAK=false
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rust_scan::config::Settings;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     println!("Points: {}", settings.scan.num_points());
//!     Ok(())
//! }
//! ```

use crate::error::{AppResult, ScanError};
use crate::error_recovery::RetryPolicy;
use crate::scan::ScanRange;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/scan.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationConfig,
    /// Scan geometry and retry settings
    pub scan: ScanConfig,
    /// Simulated device parameters
    #[serde(default)]
    pub devices: DeviceConfig,
    /// Output locations
    pub output: OutputConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Optional log file written in addition to stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Scan geometry and per-point retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// X axis range
    pub x_range: ScanRange,
    /// Y axis range
    pub y_range: ScanRange,
    /// Attempts allowed for each move and each measurement
    pub max_retries: u32,
    /// Number of readings in the moving average
    pub rolling_window_size: usize,
    /// Back-off between failed attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

/// Simulated stage parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSimConfig {
    /// Time spent on every move in milliseconds
    #[serde(default = "default_move_time")]
    pub move_time_ms: u64,
    /// Probability that a move times out
    #[serde(default = "default_fail_rate")]
    pub fail_rate: f64,
}

/// Simulated sensor parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSimConfig {
    /// Mean of successful readings
    #[serde(default = "default_base_signal")]
    pub base_signal: f64,
    /// Standard deviation of reading noise
    #[serde(default = "default_noise_level")]
    pub noise_level: f64,
    /// Probability that a reading fails
    #[serde(default = "default_fail_rate")]
    pub fail_rate: f64,
}

/// Simulated device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Noise seed shared by the simulators (0 = entropy)
    #[serde(default)]
    pub seed: u64,
    /// Stage simulator
    #[serde(default)]
    pub stage: StageSimConfig,
    /// Sensor simulator
    #[serde(default)]
    pub sensor: SensorSimConfig,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV file receiving the result rows
    pub csv: PathBuf,
    /// Optional PNG heatmap of the filtered values
    #[serde(default)]
    pub heatmap: Option<PathBuf>,
    /// Append the peak summary after the result rows
    #[serde(default = "default_include_peak")]
    pub include_peak: bool,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_retry_delay() -> u64 {
    1000
}

fn default_move_time() -> u64 {
    100
}

fn default_fail_rate() -> f64 {
    0.1
}

fn default_base_signal() -> f64 {
    1.0
}

fn default_noise_level() -> f64 {
    0.2
}

fn default_include_peak() -> bool {
    true
}

impl Default for StageSimConfig {
    fn default() -> Self {
        Self {
            move_time_ms: default_move_time(),
            fail_rate: default_fail_rate(),
        }
    }
}

impl Default for SensorSimConfig {
    fn default() -> Self {
        Self {
            base_signal: default_base_signal(),
            noise_level: default_noise_level(),
            fail_rate: default_fail_rate(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            stage: StageSimConfig::default(),
            sensor: SensorSimConfig::default(),
        }
    }
}

// ============================================================================
// Scan parameters
// ============================================================================

impl ScanConfig {
    /// Total number of points in the raster.
    pub fn num_points(&self) -> usize {
        self.x_range.steps * self.y_range.steps
    }

    /// Retry policy applied to every move and measurement.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
            .with_backoff(Duration::from_millis(self.retry_delay_ms))
    }

    /// Check the values the scan engine depends on.
    ///
    /// Runs before any device is touched; a scan never starts with an invalid
    /// window, an empty axis or non-finite bounds.
    pub fn validate(&self) -> AppResult<()> {
        validate_range("x_range", &self.x_range)?;
        validate_range("y_range", &self.y_range)?;

        if self.max_retries == 0 {
            return Err(ScanError::Configuration(
                "max_retries must be at least 1".to_string(),
            ));
        }

        if self.rolling_window_size == 0 {
            return Err(ScanError::Configuration(
                "rolling_window_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_range(name: &str, range: &ScanRange) -> AppResult<()> {
    if range.steps == 0 {
        return Err(ScanError::Configuration(format!(
            "{name}: steps must be at least 1"
        )));
    }
    if !range.start.is_finite() || !range.end.is_finite() {
        return Err(ScanError::Configuration(format!(
            "{name}: start and end must be finite numbers"
        )));
    }
    Ok(())
}

fn validate_rate(name: &str, rate: f64) -> AppResult<()> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(ScanError::Configuration(format!(
            "{name} {rate} must be between 0 and 1"
        )));
    }
    Ok(())
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl Settings {
    /// Load configuration from `config/scan.toml` and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// # Errors
    ///
    /// Returns a ScanError if the file cannot be loaded or a value is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RUSTSCAN_").split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Parse configuration from a TOML string, without environment overrides
    pub fn from_toml_str(toml: &str) -> AppResult<Self> {
        let settings: Self = Figment::new().merge(Toml::string(toml)).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Scan ranges, retry count and window size (see [`ScanConfig::validate`])
    /// - Simulator fail rates are within [0, 1] and noise is non-negative
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ScanError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        self.scan.validate()?;

        validate_rate("devices.stage.fail_rate", self.devices.stage.fail_rate)?;
        validate_rate("devices.sensor.fail_rate", self.devices.sensor.fail_rate)?;
        let noise_level = self.devices.sensor.noise_level;
        if noise_level.is_nan() || noise_level < 0.0 {
            return Err(ScanError::Configuration(format!(
                "devices.sensor.noise_level {noise_level} must be non-negative"
            )));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| ScanError::Configuration(e.to_string()))
    }
}
