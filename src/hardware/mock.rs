//! Simulated Hardware Implementations
//!
//! Provides simulated devices for running scans without physical hardware.
//! All simulated devices use async-safe operations (tokio::time::sleep, not std::thread::sleep).
//!
//! # Available Simulators
//!
//! - `SimStage` - 2-axis stage with a fixed move time and random timeouts
//! - `SimSensor` - point sensor returning a noisy constant signal with dropped reads
//!
//! Failure injection is driven by a seedable [`NoiseGenerator`], so a fixed seed
//! replays the same sequence of timeouts and readings.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::config::{SensorSimConfig, StageSimConfig};
use crate::error::DeviceFault;
use crate::hardware::capabilities::{Sensor, Stage};
use crate::hardware::noise::NoiseGenerator;

// =============================================================================
// SimStage - Simulated 2-axis Stage
// =============================================================================

/// Simulated stage with a constant move time and random timeouts
///
/// # Example
///
/// ```rust,ignore
/// let stage = SimStage::new(Duration::from_millis(100), 0.1, 42);
/// stage.move_to(10.0, 20.0).await?; // Takes ~100ms, fails 10% of the time
/// ```
pub struct SimStage {
    move_time: Duration,
    fail_rate: f64,
    position: Mutex<(f64, f64)>,
    noise: Mutex<NoiseGenerator>,
}

impl SimStage {
    /// Create a simulated stage
    ///
    /// # Arguments
    /// * `move_time` - Time spent on every move, successful or not
    /// * `fail_rate` - Probability in [0, 1] that a move times out
    /// * `seed` - Noise seed (0 = entropy)
    pub fn new(move_time: Duration, fail_rate: f64, seed: u64) -> Self {
        Self {
            move_time,
            fail_rate,
            position: Mutex::new((0.0, 0.0)),
            noise: Mutex::new(NoiseGenerator::new(seed)),
        }
    }

    /// Build from the `[devices.stage]` configuration section
    pub fn from_config(config: &StageSimConfig, seed: u64) -> Self {
        Self::new(
            Duration::from_millis(config.move_time_ms),
            config.fail_rate,
            seed,
        )
    }

    /// Last position the stage reached
    pub async fn position(&self) -> (f64, f64) {
        *self.position.lock().await
    }
}

#[async_trait]
impl Stage for SimStage {
    async fn move_to(&self, x: f64, y: f64) -> Result<(), DeviceFault> {
        sleep(self.move_time).await;

        if self.noise.lock().await.chance(self.fail_rate) {
            return Err(DeviceFault::StageTimeout { x, y });
        }

        *self.position.lock().await = (x, y);
        tracing::trace!(x, y, "SimStage reached target");
        Ok(())
    }
}

// =============================================================================
// SimSensor - Simulated Point Sensor
// =============================================================================

/// Simulated sensor returning `base_signal` plus Gaussian noise
///
/// With probability `fail_rate` a reading fails; half of those failures come
/// back as `Ok(None)` and the other half as a read error.
pub struct SimSensor {
    base_signal: f64,
    noise_level: f64,
    fail_rate: f64,
    noise: Mutex<NoiseGenerator>,
}

impl SimSensor {
    /// Create a simulated sensor
    ///
    /// # Arguments
    /// * `base_signal` - Mean of successful readings
    /// * `noise_level` - Standard deviation of the Gaussian noise
    /// * `fail_rate` - Probability in [0, 1] that a reading fails
    /// * `seed` - Noise seed (0 = entropy)
    pub fn new(base_signal: f64, noise_level: f64, fail_rate: f64, seed: u64) -> Self {
        Self {
            base_signal,
            noise_level,
            fail_rate,
            noise: Mutex::new(NoiseGenerator::new(seed)),
        }
    }

    /// Build from the `[devices.sensor]` configuration section
    pub fn from_config(config: &SensorSimConfig, seed: u64) -> Self {
        Self::new(
            config.base_signal,
            config.noise_level,
            config.fail_rate,
            seed,
        )
    }
}

#[async_trait]
impl Sensor for SimSensor {
    async fn measure(&self) -> Result<Option<f64>, DeviceFault> {
        let mut noise = self.noise.lock().await;
        if noise.chance(self.fail_rate) {
            if noise.coin() {
                return Ok(None);
            }
            return Err(DeviceFault::SensorRead("Sensor read error".to_string()));
        }
        Ok(Some(self.base_signal + noise.gaussian(self.noise_level)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
