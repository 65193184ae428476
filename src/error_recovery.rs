//! Bounded retry with a fixed back-off for fallible device operations.
//!
//! Every stage move and sensor read goes through [`retry_with_backoff`]. Each
//! call is independent: attempt counters live on the stack of that call, so
//! one point in a scan never inherits retry state from another.

use crate::error::DeviceFault;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Defines a policy for retrying an operation.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// The maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// The delay between a failed attempt and the next one.
    pub backoff_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` attempts and the default one second back-off.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Replace the back-off delay.
    pub fn with_backoff(mut self, backoff_delay: Duration) -> Self {
        self.backoff_delay = backoff_delay;
        self
    }
}

/// The device operation being retried, used to label diagnostic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOperation {
    /// Stage move to a scan point.
    Move,
    /// Sensor reading at the current position.
    Measure,
}

impl DeviceOperation {
    /// Short lowercase name used as a structured log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceOperation::Move => "move",
            DeviceOperation::Measure => "measure",
        }
    }
}

impl fmt::Display for DeviceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    /// The operation succeeded on `attempt` (1-indexed).
    Succeeded {
        /// Value returned by the successful attempt.
        value: T,
        /// Which attempt succeeded.
        attempt: u32,
    },
    /// Every allowed attempt failed.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Fault reported by the final attempt.
        last_fault: DeviceFault,
    },
}

impl<T> RetryOutcome<T> {
    /// The successful value, or `None` when retries were exhausted.
    pub fn into_value(self) -> Option<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }

    /// True when every attempt failed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryOutcome::Exhausted { .. })
    }
}

/// Runs `operation` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// `on_attempt_failure` is called with the 1-indexed attempt number and the fault
/// after every failed attempt, including the last. The task sleeps for
/// `policy.backoff_delay` between attempts but not after the final one, so an
/// exhausted operation costs `max_attempts - 1` back-offs rather than one per
/// failure.
///
/// A policy with `max_attempts == 0` makes no attempt at all; configuration
/// validation rejects such policies before a scan starts.
pub async fn retry_with_backoff<T, F, Fut, H>(
    op_kind: DeviceOperation,
    policy: &RetryPolicy,
    mut operation: F,
    mut on_attempt_failure: H,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeviceFault>>,
    H: FnMut(u32, &DeviceFault),
{
    let mut last_fault = None;

    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(value) => {
                tracing::info!(
                    operation = %op_kind,
                    attempt,
                    "{} succeeded on attempt {}",
                    op_kind,
                    attempt
                );
                return RetryOutcome::Succeeded { value, attempt };
            }
            Err(fault) => {
                tracing::warn!(
                    operation = %op_kind,
                    attempt,
                    error = %fault,
                    "{} failed at attempt {}",
                    op_kind,
                    attempt
                );
                on_attempt_failure(attempt, &fault);
                last_fault = Some(fault);
                if attempt < policy.max_attempts {
                    sleep(policy.backoff_delay).await;
                }
            }
        }
    }

    let last_fault = last_fault.unwrap_or(DeviceFault::NoReading);
    tracing::error!(
        operation = %op_kind,
        attempts = policy.max_attempts,
        error = %last_fault,
        "{} retries exhausted after {} attempts",
        op_kind,
        policy.max_attempts
    );
    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
        last_fault,
    }
}
