//! Device capabilities and simulated devices.
//!
//! The scan engine only talks to the [`Stage`] and [`Sensor`] traits. The
//! simulated implementations in [`mock`] stand in for real hardware.

pub mod capabilities;
pub mod mock;
pub mod noise;

pub use capabilities::{Sensor, Stage};
pub use mock::{SimSensor, SimStage};
pub use noise::NoiseGenerator;
