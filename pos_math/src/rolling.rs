//! Trailing-window calculations
//!
//! Contains the shrinking-window trailing mean used for the 7-row sales and
//! customer averages, and the index-based lag used for "same weekday last
//! week" figures.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Trailing mean over the current value plus up to `period - 1` preceding ones.
///
/// Unlike a classic simple moving average this never waits for a full
/// window: the first value already yields a mean over a window of size 1.
#[derive(Debug, Clone)]
pub struct TrailingMean {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl TrailingMean {
    /// Create a new trailing mean with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, evicting the oldest one once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Mean of the values currently inside the window
    pub fn value(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(MathError::InsufficientData(
                "Trailing mean has not seen any value yet".to_string(),
            ));
        }

        Ok(self.sum / self.values.len() as f64)
    }

    /// Number of values currently inside the window
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the configured period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the window, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Trailing mean at every position of `values`.
///
/// The window shrinks at the start of the series, so the output has the same
/// length as the input and never contains an undefined value.
pub fn trailing_means(values: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut window = TrailingMean::new(period)?;
    let mut means = Vec::with_capacity(values.len());

    for &value in values {
        window.update(value);
        means.push(window.value()?);
    }

    Ok(means)
}

/// Value `periods` positions earlier, by index rather than by calendar distance.
pub fn lag(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(periods).map(|j| values[j]))
        .collect()
}
