//! CART regression tree with a squared-error split criterion

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Split gains at or below this are treated as no improvement
const MIN_GAIN: f64 = 1e-12;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until the leaf limits stop it
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Squared-error decrease per feature, normalized to sum to 1
    importances: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
    gains: Vec<f64>,
}

/// Reject a row whose width differs from what `model` was fitted on
pub(crate) fn check_row_width(model: &str, expected: usize, row: &[f64]) -> Result<()> {
    if row.len() != expected {
        return Err(ForecastError::SchemaMismatch(format!(
            "{} expects {} features, got {}",
            model,
            expected,
            row.len()
        )));
    }
    Ok(())
}

impl RegressionTree {
    /// Fit on the rows of `x` named by `sample` (repeats allowed, as in a bootstrap draw)
    pub fn fit(x: &[Vec<f64>], y: &[f64], sample: &[usize], params: TreeParams) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ForecastError::SchemaMismatch(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if sample.is_empty() {
            return Err(ForecastError::ModelError(
                "cannot fit a tree on an empty sample".to_string(),
            ));
        }
        let n_features = x.first().map_or(0, Vec::len);
        if let Some(row) = x.iter().find(|row| row.len() != n_features) {
            return Err(ForecastError::SchemaMismatch(format!(
                "ragged feature rows: expected {} columns, found {}",
                n_features,
                row.len()
            )));
        }

        let mut builder = Builder {
            x,
            y,
            params,
            nodes: Vec::new(),
            gains: vec![0.0; n_features],
        };
        let mut indices = sample.to_vec();
        builder.grow(&mut indices, 0);

        let total: f64 = builder.gains.iter().sum();
        let importances = if total > 0.0 {
            builder.gains.iter().map(|g| g / total).collect()
        } else {
            builder.gains
        };

        Ok(Self {
            nodes: builder.nodes,
            importances,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Width of the rows the tree was fitted on
    pub fn n_features(&self) -> usize {
        self.importances.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl<'a> Builder<'a> {
    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let node_id = self.nodes.len();
        let value = indices.iter().map(|&i| self.y[i]).sum::<f64>() / indices.len() as f64;
        self.nodes.push(Node::Leaf { value });

        let depth_left = self.params.max_depth.map_or(true, |max| depth < max);
        let n = indices.len();
        if !depth_left
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf.max(1)
        {
            return node_id;
        }

        let Some(best) = self.best_split(indices) else {
            return node_id;
        };

        let mut mid = 0;
        for i in 0..indices.len() {
            if self.x[indices[i]][best.feature] <= best.threshold {
                indices.swap(i, mid);
                mid += 1;
            }
        }

        self.gains[best.feature] += best.gain;
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.grow(left_indices, depth + 1);
        let right = self.grow(right_indices, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_id
    }

    /// Best squared-error split over every feature, scanning sorted values once per feature
    fn best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let n_features = self.x[indices[0]].len();
        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in 0..n_features {
            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (self.x[i][feature], self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let (value, target) = pairs[k];
                left_sum += target;
                left_sq += target * target;

                let left_n = k + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }
                let next = pairs[k + 1].0;
                if next <= value {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);
                let gain = parent_sse - sse;

                if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}
