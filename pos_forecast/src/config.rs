//! Runtime configuration
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields the stock pipeline: a 100-tree random forest trained on an 80/20
//! split seeded with 42, a 10-row training minimum, and artifacts stored
//! under `./data`.

use crate::error::{ForecastError, Result};
use crate::models::boosting::BoostingParams;
use crate::models::forest::ForestParams;
use crate::models::ModelStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the forecasting service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Directory holding every user's datasets and model artifacts
    pub storage_root: PathBuf,
    /// Regressor family used for newly trained models
    pub strategy: ModelStrategy,
    pub training: TrainingConfig,
    /// Forest used by the `random_forest` strategy
    pub forest: ForestParams,
    pub blend: BlendConfig,
    pub prediction: PredictionConfig,
}

/// Split and sample-size settings shared by every strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub min_samples: usize,
    pub test_ratio: f64,
    pub seed: u64,
}

/// Components and weights of the `weighted_blend` strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub forest: ForestParams,
    pub boosting: BoostingParams,
    /// L2 penalty keeping the least-squares component well-posed when
    /// features are constant or collinear
    pub ridge_penalty: f64,
    pub weights: BlendWeights,
}

/// Fixed weights of the blend components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    pub forest: f64,
    pub boosting: f64,
    pub linear: f64,
}

/// Interval and placeholder settings used at prediction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Number of leading ensemble members whose spread sizes the interval
    pub interval_members: usize,
    pub z_score: f64,
    /// Rolling/lag placeholder for sales when a user has no history
    pub default_sales: f64,
    /// Rolling/lag placeholder for customers when a user has no history
    pub default_customers: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("data"),
            strategy: ModelStrategy::RandomForest,
            training: TrainingConfig::default(),
            forest: ForestParams::default(),
            blend: BlendConfig::default(),
            prediction: PredictionConfig::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::unconstrained(),
            boosting: BoostingParams::default(),
            ridge_penalty: 1e-3,
            weights: BlendWeights::default(),
        }
    }
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            forest: 0.5,
            boosting: 0.3,
            linear: 0.2,
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            interval_members: 10,
            z_score: 1.96,
            default_sales: 50_000.0,
            default_customers: 50.0,
        }
    }
}

impl ForecastConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ForecastConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ForecastError::ConfigError(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Same configuration rooted at another storage directory
    pub fn with_storage_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.storage_root = root.into();
        self
    }

    pub fn with_strategy(mut self, strategy: ModelStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let training = &self.training;
        if !(training.test_ratio > 0.0 && training.test_ratio < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "test_ratio must be in (0, 1), got {}",
                training.test_ratio
            )));
        }
        if training.min_samples < 2 {
            return Err(ForecastError::InvalidParameter(
                "min_samples must be at least 2 so both splits are non-empty".to_string(),
            ));
        }

        self.forest.validate()?;
        self.blend.forest.validate()?;
        self.blend.boosting.validate()?;

        let w = self.blend.weights;
        if w.forest < 0.0 || w.boosting < 0.0 || w.linear < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "blend weights must be non-negative".to_string(),
            ));
        }
        if w.forest + w.boosting + w.linear <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "blend weights must not all be zero".to_string(),
            ));
        }
        if self.blend.ridge_penalty < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "ridge_penalty must be non-negative".to_string(),
            ));
        }

        let prediction = &self.prediction;
        if prediction.interval_members == 0 {
            return Err(ForecastError::InvalidParameter(
                "interval_members must be positive".to_string(),
            ));
        }
        if prediction.z_score < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "z_score must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}
