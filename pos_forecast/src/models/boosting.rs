//! Least-squares gradient boosting over shallow regression trees

use super::forest::average_importances;
use super::tree::{check_row_width, RegressionTree, TreeParams};
use super::Regressor;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 || self.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "boosting needs positive n_estimators and max_depth".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "boosting learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.min_samples_split < 2 || self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "boosting needs min_samples_split >= 2 and min_samples_leaf >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stage-wise additive model: the mean of the targets plus shrunken trees
/// fitted to the running residuals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    init: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            init: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.params.validate()?;
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::SchemaMismatch(format!(
                "boosting needs matching non-empty inputs, got {} rows and {} targets",
                x.len(),
                y.len()
            )));
        }

        let tree_params = TreeParams {
            max_depth: Some(self.params.max_depth),
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
        };
        let sample: Vec<usize> = (0..x.len()).collect();
        let init = y.iter().sum::<f64>() / y.len() as f64;
        let mut fitted = vec![init; y.len()];
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(t, f)| t - f).collect();
            let tree = RegressionTree::fit(x, &residuals, &sample, tree_params)?;
            for (value, row) in fitted.iter_mut().zip(x) {
                *value += self.params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        self.init = init;
        self.trees = trees;
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let Some(first) = self.trees.first() else {
            return Err(ForecastError::ModelNotTrained(
                "boosting model has not been fitted".to_string(),
            ));
        };
        check_row_width("boosting model", first.n_features(), row)?;
        Ok(self.init
            + self.params.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|tree| tree.predict_row(row))
                    .sum::<f64>())
    }

    fn feature_importances(&self) -> Vec<f64> {
        average_importances(self.trees.iter().map(RegressionTree::feature_importances))
    }
}
