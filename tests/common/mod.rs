//! Scripted device doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use rust_scan::hardware::{Sensor, Stage};
use rust_scan::DeviceFault;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Stage that records every target and fails whenever `fails` says so.
pub struct RecordingStage {
    pub moves: Mutex<Vec<(f64, f64)>>,
    fails: fn(f64, f64, usize) -> bool,
}

impl RecordingStage {
    /// Stage that always succeeds.
    pub fn reliable() -> Self {
        Self::failing_when(|_, _, _| false)
    }

    /// `fails(x, y, attempt)` decides each move; `attempt` counts from 1 per target.
    pub fn failing_when(fails: fn(f64, f64, usize) -> bool) -> Self {
        Self {
            moves: Mutex::new(Vec::new()),
            fails,
        }
    }

    pub fn moves(&self) -> Vec<(f64, f64)> {
        self.moves.lock().unwrap().clone()
    }
}

#[async_trait]
impl Stage for RecordingStage {
    async fn move_to(&self, x: f64, y: f64) -> Result<(), DeviceFault> {
        let mut moves = self.moves.lock().unwrap();
        moves.push((x, y));
        let attempt = moves.iter().filter(|m| **m == (x, y)).count();
        if (self.fails)(x, y, attempt) {
            Err(DeviceFault::StageTimeout { x, y })
        } else {
            Ok(())
        }
    }
}

/// Sensor that replays a script and then falls back to a fixed response.
pub struct ScriptedSensor {
    script: Mutex<VecDeque<Result<Option<f64>, DeviceFault>>>,
    fallback: Result<Option<f64>, DeviceFault>,
    pub calls: Mutex<usize>,
}

impl ScriptedSensor {
    pub fn new(script: Vec<Result<Option<f64>, DeviceFault>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Ok(None),
            calls: Mutex::new(0),
        }
    }

    /// Sensor that always reads `value`.
    pub fn constant(value: f64) -> Self {
        Self {
            fallback: Ok(Some(value)),
            ..Self::new(Vec::new())
        }
    }

    /// Sensor that never produces a reading.
    pub fn broken() -> Self {
        Self {
            fallback: Err(DeviceFault::SensorRead("Sensor read error".to_string())),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Sensor for ScriptedSensor {
    async fn measure(&self) -> Result<Option<f64>, DeviceFault> {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
