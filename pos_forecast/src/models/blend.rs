//! Fixed-weight blend of a forest, a boosting model and a linear model

use super::boosting::GradientBoosting;
use super::forest::RandomForest;
use super::linear::LinearModel;
use super::Regressor;
use crate::config::{BlendConfig, BlendWeights};
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedBlend {
    weights: BlendWeights,
    forest: RandomForest,
    boosting: GradientBoosting,
    linear: LinearModel,
}

impl WeightedBlend {
    pub fn new(config: &BlendConfig, seed: u64) -> Self {
        Self {
            weights: config.weights,
            forest: RandomForest::new(config.forest, seed),
            boosting: GradientBoosting::new(config.boosting),
            linear: LinearModel::new(config.ridge_penalty),
        }
    }

    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    fn total_weight(&self) -> f64 {
        self.weights.forest + self.weights.boosting + self.weights.linear
    }
}

impl Regressor for WeightedBlend {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.forest.fit(x, y)?;
        self.boosting.fit(x, y)?;
        self.linear.fit(x, y)?;
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let w = self.weights;
        let blended = w.forest * self.forest.predict_row(row)?
            + w.boosting * self.boosting.predict_row(row)?
            + w.linear * self.linear.predict_row(row)?;
        Ok(blended / self.total_weight())
    }

    /// Tree importances weighted by their blend share; the linear part has none
    fn feature_importances(&self) -> Vec<f64> {
        let forest = self.forest.feature_importances();
        let boosting = self.boosting.feature_importances();
        let combined: Vec<f64> = forest
            .iter()
            .zip(&boosting)
            .map(|(f, b)| self.weights.forest * f + self.weights.boosting * b)
            .collect();

        let total: f64 = combined.iter().sum();
        if total > 0.0 {
            combined.iter().map(|v| v / total).collect()
        } else {
            combined
        }
    }

    /// Spread of the forest component's members
    fn spread(&self, row: &[f64], members: usize) -> Result<f64> {
        self.forest.spread(row, members)
    }
}
