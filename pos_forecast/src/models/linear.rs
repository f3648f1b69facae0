//! Ridge-stabilised least squares

use super::Regressor;
use crate::error::{ForecastError, Result};
use linfa::traits::Fit;
use linfa::DatasetBase;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Linear model fitted with `linfa-linear`.
///
/// Inputs are centred and augmented with `sqrt(penalty)` identity rows so the
/// normal equations stay solvable for constant or collinear features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    penalty: f64,
    coefficients: Vec<f64>,
    intercept: f64,
    fitted: bool,
}

impl LinearModel {
    pub fn new(penalty: f64) -> Self {
        Self {
            penalty,
            coefficients: Vec::new(),
            intercept: 0.0,
            fitted: false,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::SchemaMismatch(format!(
                "linear model needs matching non-empty inputs, got {} rows and {} targets",
                x.len(),
                y.len()
            )));
        }
        let n = x.len();
        let width = x[0].len();

        let x_mean: Vec<f64> = (0..width)
            .map(|col| x.iter().map(|row| row[col]).sum::<f64>() / n as f64)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n as f64;

        let ridge = self.penalty.max(0.0).sqrt();
        let mut records = Array2::<f64>::zeros((n + width, width));
        let mut targets = Array1::<f64>::zeros(n + width);
        for (i, row) in x.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                records[[i, j]] = value - x_mean[j];
            }
            targets[i] = y[i] - y_mean;
        }
        for j in 0..width {
            records[[n + j, j]] = ridge;
        }

        let dataset = DatasetBase::from(records).with_targets(targets);
        let fitted = LinearRegression::new()
            .with_intercept(false)
            .fit(&dataset)
            .map_err(|e| ForecastError::ModelError(format!("least squares failed: {}", e)))?;

        let coefficients: Vec<f64> = fitted.params().iter().copied().collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::ModelError(
                "least squares produced non-finite coefficients".to_string(),
            ));
        }
        self.intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(c, m)| c * m)
                .sum::<f64>();
        self.coefficients = coefficients;
        self.fitted = true;
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if !self.fitted {
            return Err(ForecastError::ModelNotTrained(
                "linear model has not been fitted".to_string(),
            ));
        }
        if row.len() != self.coefficients.len() {
            return Err(ForecastError::SchemaMismatch(format!(
                "linear model expects {} features, got {}",
                self.coefficients.len(),
                row.len()
            )));
        }
        Ok(self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(v, c)| v * c)
                .sum::<f64>())
    }

    /// Absolute coefficients, normalized to sum to 1
    fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.coefficients.iter().map(|c| c.abs()).sum();
        if total > 0.0 {
            self.coefficients.iter().map(|c| c.abs() / total).collect()
        } else {
            vec![0.0; self.coefficients.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_a_plane() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![f64::from(i), f64::from((i * 7) % 5), 1.0])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 5.0).collect();

        let mut model = LinearModel::new(1e-6);
        model.fit(&x, &y).unwrap();

        let prediction = model.predict_row(&[10.0, 1.0, 1.0]).unwrap();
        assert!((prediction - 33.0).abs() < 1e-3);
        // the constant column carries no weight
        assert!(model.coefficients()[2].abs() < 1e-9);
    }

    #[test]
    fn test_unfitted() {
        assert!(LinearModel::new(1e-3).predict_row(&[1.0]).is_err());
    }
}
