//! Device capabilities consumed by the scan engine.
//!
//! The engine only ever moves a stage to an (x, y) target and asks a point
//! sensor for one reading. Anything that can do those two things can be
//! scanned: simulated devices, serial controllers, or test doubles.

use crate::error::DeviceFault;
use async_trait::async_trait;

/// Capability for a 2-axis positioning stage.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Move to an absolute (x, y) position.
    ///
    /// Each call re-issues the full move, so retrying after a timeout is safe.
    ///
    /// # Errors
    /// - [`DeviceFault::StageTimeout`] when the stage did not reach the target
    async fn move_to(&self, x: f64, y: f64) -> Result<(), DeviceFault>;
}

/// Capability for a point sensor.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Take a single reading at the current stage position.
    ///
    /// `Ok(None)` means the sensor answered without a value. The scan engine
    /// treats that exactly like an error and retries.
    async fn measure(&self) -> Result<Option<f64>, DeviceFault>;
}
