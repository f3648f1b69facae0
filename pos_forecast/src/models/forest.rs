//! Bagged regression forest

use super::tree::{check_row_width, RegressionTree, TreeParams};
use super::Regressor;
use crate::error::{ForecastError, Result};
use pos_math::population_std_dev;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Forest hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

impl ForestParams {
    /// Fully grown trees, as used inside the weighted blend
    pub fn unconstrained() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "forest n_estimators must be positive".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "forest max_depth must be positive".to_string(),
            ));
        }
        if self.min_samples_split < 2 || self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "forest needs min_samples_split >= 2 and min_samples_leaf >= 1".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Bootstrap-aggregated regression trees. Tree `i` draws its sample from a
/// generator seeded with `seed + i`, so fitting is reproducible regardless of
/// how rayon schedules the trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    seed: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Predictions of the first `n` trees
    pub fn member_predictions(&self, row: &[f64], n: usize) -> Result<Vec<f64>> {
        self.ensure_ready(row)?;
        Ok(self
            .trees
            .iter()
            .take(n)
            .map(|tree| tree.predict_row(row))
            .collect())
    }

    fn ensure_ready(&self, row: &[f64]) -> Result<()> {
        let Some(first) = self.trees.first() else {
            return Err(ForecastError::ModelNotTrained(
                "forest has not been fitted".to_string(),
            ));
        };
        check_row_width("forest", first.n_features(), row)
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.params.validate()?;
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::SchemaMismatch(format!(
                "forest needs matching non-empty inputs, got {} rows and {} targets",
                x.len(),
                y.len()
            )));
        }

        let n = x.len();
        let tree_params = self.params.tree_params();
        let seed = self.seed;
        let trees = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, tree_params)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        self.ensure_ready(row)?;
        let total: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
        Ok(total / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> Vec<f64> {
        average_importances(self.trees.iter().map(RegressionTree::feature_importances))
    }

    fn spread(&self, row: &[f64], members: usize) -> Result<f64> {
        Ok(population_std_dev(&self.member_predictions(row, members)?))
    }
}

/// Element-wise mean of per-tree importance vectors
pub(crate) fn average_importances<'a>(per_tree: impl Iterator<Item = &'a [f64]>) -> Vec<f64> {
    let mut total: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for importances in per_tree {
        if total.is_empty() {
            total = vec![0.0; importances.len()];
        }
        for (acc, value) in total.iter_mut().zip(importances) {
            *acc += value;
        }
        count += 1;
    }
    if count > 0 {
        for value in &mut total {
            *value /= count as f64;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| 10.0 * i as f64).collect();
        (x, y)
    }

    #[test]
    fn test_forest_is_reproducible() {
        let (x, y) = linear_data(40);
        let params = ForestParams {
            n_estimators: 12,
            ..ForestParams::default()
        };

        let mut a = RandomForest::new(params, 42);
        let mut b = RandomForest::new(params, 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 12);
        assert_eq!(a.member_predictions(&x[5], 10).unwrap().len(), 10);
    }

    #[test]
    fn test_forest_tracks_the_trend() {
        let (x, y) = linear_data(40);
        let mut forest = RandomForest::new(ForestParams::default(), 7);
        forest.fit(&x, &y).unwrap();

        let low = forest.predict_row(&[2.0, 2.0]).unwrap();
        let high = forest.predict_row(&[37.0, 1.0]).unwrap();
        assert!(low < high);

        let importances = forest.feature_importances();
        assert!(importances[0] > importances[1]);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(forest.spread(&[20.0, 2.0], 10).unwrap() >= 0.0);
    }

    #[test]
    fn test_unfitted_forest() {
        let forest = RandomForest::new(ForestParams::default(), 42);
        assert!(matches!(
            forest.predict_row(&[1.0]),
            Err(ForecastError::ModelNotTrained(_))
        ));
    }

    #[test]
    fn test_short_row_is_a_schema_mismatch() {
        let (x, y) = linear_data(20);
        let mut forest = RandomForest::new(ForestParams::default(), 3);
        forest.fit(&x, &y).unwrap();

        assert!(matches!(
            forest.predict_row(&[1.0]),
            Err(ForecastError::SchemaMismatch(_))
        ));
        assert!(matches!(
            forest.spread(&[1.0, 2.0, 3.0], 10),
            Err(ForecastError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(ForestParams::default().validate().is_ok());
        let bad = ForestParams {
            min_samples_leaf: 0,
            ..ForestParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
