//! Hold-out accuracy metrics for the regressors

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Mean Absolute Error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()))
}

/// Mean Squared Error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)))
}

/// Root Mean Squared Error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_squared_error(actual, predicted).sqrt()
}

/// Mean Absolute Percentage Error in percent, with each denominator clamped to at least 1
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(
        actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs() / a.abs().max(1.0)),
    ) * 100.0
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: a perfect fit scores 1 and
/// anything else 0, so the value is always finite.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let target_mean = mean(actual.iter().copied());
    let ss_tot: f64 = actual.iter().map(|a| (a - target_mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Accuracy of one target on the held-out split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
    pub mape: f64,
}

/// Evaluate predictions against the truth
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<RegressionMetrics> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "actual and predicted values must have the same non-zero length".to_string(),
        ));
    }

    Ok(RegressionMetrics {
        mae: mean_absolute_error(actual, predicted),
        mse: mean_squared_error(actual, predicted),
        rmse: root_mean_squared_error(actual, predicted),
        r2: r2_score(actual, predicted),
        mape: mean_absolute_percentage_error(actual, predicted),
    })
}

impl RegressionMetrics {
    pub fn is_finite(&self) -> bool {
        [self.mae, self.mse, self.rmse, self.r2, self.mape]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl std::fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  MAE:  {:.4}", self.mae)?;
        writeln!(f, "  MSE:  {:.4}", self.mse)?;
        writeln!(f, "  RMSE: {:.4}", self.rmse)?;
        writeln!(f, "  R2:   {:.4}", self.r2)?;
        writeln!(f, "  MAPE: {:.4}%", self.mape)?;
        Ok(())
    }
}
