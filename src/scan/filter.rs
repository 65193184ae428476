//! Moving average over accepted readings.

use crate::error::{AppResult, ScanError};
use std::collections::VecDeque;

/// Fixed-window moving average over accepted sensor readings.
///
/// One instance belongs to one scan run. Failed points never reach it, so the
/// window only ever holds real readings.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    window: VecDeque<f64>,
    window_size: usize,
}

impl RollingAverage {
    /// Create an empty window. A `window_size` of zero is a configuration error.
    pub fn new(window_size: usize) -> AppResult<Self> {
        if window_size == 0 {
            return Err(ScanError::Configuration(
                "rolling_window_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
        })
    }

    /// Add a reading and return the mean of the window, rounded to 2 decimals
    /// with ties going to the even digit.
    pub fn push(&mut self, value: f64) -> f64 {
        self.window.push_back(value);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
        let mean = self.window.iter().sum::<f64>() / self.window.len() as f64;
        round2(mean)
    }

    /// Readings currently in the window, oldest first.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }

    /// Number of readings currently in the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// True before the first reading.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Configured window size.
    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average_one_by_one() {
        let mut filter = RollingAverage::new(2).unwrap();
        assert_eq!(filter.push(10.0), 10.0);
        assert_eq!(filter.push(20.0), 15.0);
        assert_eq!(filter.push(30.0), 25.0);
    }

    #[test]
    fn test_rolling_average_from_list() {
        let mut filter = RollingAverage::new(2).unwrap();
        let averages: Vec<f64> = [10.0, 20.0, 30.0, 40.0]
            .into_iter()
            .map(|v| filter.push(v))
            .collect();
        assert_eq!(averages, vec![10.0, 15.0, 25.0, 35.0]);
    }

    #[test]
    fn test_window_never_exceeds_size() {
        let mut filter = RollingAverage::new(3).unwrap();
        for v in 0..10 {
            filter.push(v as f64);
            assert!(filter.len() <= 3);
        }
        assert_eq!(filter.values().collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_average_is_rounded_to_two_places() {
        let mut filter = RollingAverage::new(3).unwrap();
        filter.push(1.0);
        filter.push(1.0);
        assert_eq!(filter.push(2.0), 1.33);
    }

    #[test]
    fn test_half_way_means_round_to_even() {
        let mut filter = RollingAverage::new(2).unwrap();
        filter.push(1.0);
        // 1.125 and 2.625 are exact in binary
        assert_eq!(filter.push(1.25), 1.12);

        let mut filter = RollingAverage::new(2).unwrap();
        filter.push(2.5);
        assert_eq!(filter.push(2.75), 2.62);
    }

    #[test]
    fn test_window_size_one_tracks_latest() {
        let mut filter = RollingAverage::new(1).unwrap();
        assert_eq!(filter.push(4.5), 4.5);
        assert_eq!(filter.push(-2.25), -2.25);
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = RollingAverage::new(0).unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));
    }
}
