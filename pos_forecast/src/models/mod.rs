//! Sales and customer forecasting models
//!
//! [`SalesForecastModel`] owns two independent regressors (one per target),
//! the scaler fitted on their training split, and the frozen feature-column
//! order. The regressor family is chosen at construction through
//! [`ModelStrategy`]; every family shares the same train, predict and
//! serialize contract.

pub mod blend;
pub mod boosting;
pub mod forest;
pub mod linear;
pub mod tree;

use crate::config::{BlendConfig, ForecastConfig, PredictionConfig, TrainingConfig};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureFrame, Targets, FEATURE_COLUMNS};
use crate::metrics::{evaluate, RegressionMetrics};
use crate::scaler::StandardScaler;
use crate::utils::{take_rows, train_test_split};
use blend::WeightedBlend;
use chrono::{DateTime, Utc};
use forest::{ForestParams, RandomForest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Common interface of every regressor
pub trait Regressor {
    /// Fit on row-major features and one target per row
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    fn predict_row(&self, row: &[f64]) -> Result<f64>;

    /// Per-feature importances in input column order, summing to 1 when any split was made
    fn feature_importances(&self) -> Vec<f64>;

    /// Population standard deviation of the first `members` ensemble members
    /// at `row`. Models without independent members report zero.
    fn spread(&self, _row: &[f64], _members: usize) -> Result<f64> {
        Ok(0.0)
    }
}

/// Regressor family used for both targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStrategy {
    /// A single bagged forest
    #[default]
    RandomForest,
    /// Forest, boosting and least squares combined with fixed weights
    WeightedBlend,
}

impl ModelStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelStrategy::RandomForest => "random_forest",
            ModelStrategy::WeightedBlend => "weighted_blend",
        }
    }
}

impl fmt::Display for ModelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelStrategy {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "random_forest" | "forest" => Ok(ModelStrategy::RandomForest),
            "weighted_blend" | "blend" | "ensemble" => Ok(ModelStrategy::WeightedBlend),
            other => Err(ForecastError::InvalidParameter(format!(
                "unknown model strategy: {}",
                other
            ))),
        }
    }
}

/// One fitted regressor, as chosen by the strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetModel {
    Forest(RandomForest),
    Blend(WeightedBlend),
}

impl TargetModel {
    fn new(settings: &ModelSettings) -> Self {
        let seed = settings.training.seed;
        match settings.strategy {
            ModelStrategy::RandomForest => TargetModel::Forest(RandomForest::new(settings.forest, seed)),
            ModelStrategy::WeightedBlend => TargetModel::Blend(WeightedBlend::new(&settings.blend, seed)),
        }
    }

    fn inner(&self) -> &(dyn Regressor + Send + Sync) {
        match self {
            TargetModel::Forest(model) => model,
            TargetModel::Blend(model) => model,
        }
    }
}

impl Regressor for TargetModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        match self {
            TargetModel::Forest(model) => model.fit(x, y),
            TargetModel::Blend(model) => model.fit(x, y),
        }
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        self.inner().predict_row(row)
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.inner().feature_importances()
    }

    fn spread(&self, row: &[f64], members: usize) -> Result<f64> {
        self.inner().spread(row, members)
    }
}

/// Settings captured into a model so an artifact predicts the same way it was trained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub strategy: ModelStrategy,
    pub training: TrainingConfig,
    pub forest: ForestParams,
    pub blend: BlendConfig,
    pub prediction: PredictionConfig,
}

impl From<&ForecastConfig> for ModelSettings {
    fn from(config: &ForecastConfig) -> Self {
        Self {
            strategy: config.strategy,
            training: config.training.clone(),
            forest: config.forest,
            blend: config.blend.clone(),
            prediction: config.prediction.clone(),
        }
    }
}

/// Importance of one feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_type: ModelStrategy,
    pub sales_metrics: RegressionMetrics,
    pub customers_metrics: RegressionMetrics,
    pub sales_feature_importance: Vec<FeatureImportance>,
    pub customers_feature_importance: Vec<FeatureImportance>,
    pub training_samples: usize,
    pub test_samples: usize,
}

/// Closed interval around a point estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub lower: T,
    pub upper: T,
}

/// Point estimates and approximate 95% intervals for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub sales: f64,
    pub customers: u32,
    pub sales_interval: Interval<f64>,
    pub customers_interval: Interval<u32>,
}

/// Everything produced by one successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedState {
    pub feature_columns: Vec<String>,
    pub scaler: StandardScaler,
    pub sales: TargetModel,
    pub customers: TargetModel,
    pub report: TrainingReport,
    pub trained_at: DateTime<Utc>,
}

/// Trained-model lifecycle: empty until the first successful `train`,
/// replaced wholesale by every later one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesForecastModel {
    settings: ModelSettings,
    state: Option<FittedState>,
}

impl SalesForecastModel {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            settings: ModelSettings::from(config),
            state: None,
        }
    }

    pub fn strategy(&self) -> ModelStrategy {
        self.settings.strategy
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    /// Frozen column order, once trained
    pub fn feature_columns(&self) -> Option<&[String]> {
        self.state.as_ref().map(|s| s.feature_columns.as_slice())
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.state.as_ref().map(|s| &s.report)
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.state.as_ref().map(|s| s.trained_at)
    }

    /// Fit both regressors on a held-out split and swap the result in.
    ///
    /// The live state is only replaced once everything has been fitted and
    /// evaluated; any failure leaves the previous model untouched.
    pub fn train(&mut self, features: &FeatureFrame, targets: &Targets) -> Result<TrainingReport> {
        let state = self.fit_state(features, targets)?;
        let report = state.report.clone();
        self.state = Some(state);
        Ok(report)
    }

    fn fit_state(&self, features: &FeatureFrame, targets: &Targets) -> Result<FittedState> {
        let mut expected: Vec<&str> = FEATURE_COLUMNS.to_vec();
        let mut actual: Vec<&str> = features.columns().iter().map(String::as_str).collect();
        expected.sort_unstable();
        actual.sort_unstable();
        if expected != actual {
            return Err(ForecastError::SchemaMismatch(format!(
                "expected feature columns {:?}, got {:?}",
                FEATURE_COLUMNS,
                features.columns()
            )));
        }
        let features = features.select(&FEATURE_COLUMNS)?;

        let n = features.height();
        if targets.sales.len() != n || targets.customers.len() != n {
            return Err(ForecastError::SchemaMismatch(format!(
                "{} feature rows but {} sales and {} customer targets",
                n,
                targets.sales.len(),
                targets.customers.len()
            )));
        }
        let training = &self.settings.training;
        if n < training.min_samples {
            return Err(ForecastError::InsufficientData {
                required: training.min_samples,
                actual: n,
            });
        }

        let split = train_test_split(n, training.test_ratio, training.seed);
        debug!(
            train = split.train.len(),
            test = split.test.len(),
            "split training data"
        );

        let x_train = take_rows(features.rows(), &split.train);
        let x_test = take_rows(features.rows(), &split.test);
        let scaler = StandardScaler::fit(&x_train)?;
        let x_train = scaler.transform(&x_train)?;
        let x_test = scaler.transform(&x_test)?;

        let sales_train = take_rows(&targets.sales, &split.train);
        let sales_test = take_rows(&targets.sales, &split.test);
        let customers_train = take_rows(&targets.customers, &split.train);
        let customers_test = take_rows(&targets.customers, &split.test);

        let mut sales = TargetModel::new(&self.settings);
        let mut customers = TargetModel::new(&self.settings);
        let (sales_fit, customers_fit) = rayon::join(
            || sales.fit(&x_train, &sales_train),
            || customers.fit(&x_train, &customers_train),
        );
        sales_fit?;
        customers_fit?;

        let sales_pred = predict_rows(&sales, &x_test)?;
        let customers_pred = predict_rows(&customers, &x_test)?;

        let report = TrainingReport {
            model_type: self.settings.strategy,
            sales_metrics: evaluate(&sales_test, &sales_pred)?,
            customers_metrics: evaluate(&customers_test, &customers_pred)?,
            sales_feature_importance: named_importances(features.columns(), &sales),
            customers_feature_importance: named_importances(features.columns(), &customers),
            training_samples: split.train.len(),
            test_samples: split.test.len(),
        };
        info!(
            strategy = %self.settings.strategy,
            training_samples = report.training_samples,
            test_samples = report.test_samples,
            sales_r2 = report.sales_metrics.r2,
            customers_r2 = report.customers_metrics.r2,
            "trained forecast model"
        );

        Ok(FittedState {
            feature_columns: features.columns().to_vec(),
            scaler,
            sales,
            customers,
            report,
            trained_at: Utc::now(),
        })
    }

    /// Predict one day from a single-row frame
    pub fn predict(&self, features: &FeatureFrame) -> Result<PredictionResult> {
        let state = self.state.as_ref().ok_or_else(|| {
            ForecastError::ModelNotTrained("train a model before predicting".to_string())
        })?;
        if features.height() != 1 {
            return Err(ForecastError::InvalidParameter(format!(
                "prediction takes exactly one row, got {}",
                features.height()
            )));
        }

        let aligned = features.select(&state.feature_columns)?;
        let raw = aligned
            .row(0)
            .ok_or_else(|| ForecastError::InvalidParameter("empty prediction row".to_string()))?;
        let row = state.scaler.transform_row(raw)?;

        let prediction = &self.settings.prediction;
        let z = prediction.z_score;
        let members = prediction.interval_members;

        let sales = state.sales.predict_row(&row)?;
        let sales_sd = state.sales.spread(&row, members)?;
        let customers = state.customers.predict_row(&row)?;
        let customers_sd = state.customers.spread(&row, members)?;
        if ![sales, sales_sd, customers, customers_sd].iter().all(|v| v.is_finite()) {
            return Err(ForecastError::ModelError(
                "model produced a non-finite estimate".to_string(),
            ));
        }

        Ok(PredictionResult {
            sales: sales.max(0.0),
            customers: customers.max(0.0).floor() as u32,
            sales_interval: Interval {
                lower: (sales - z * sales_sd).max(0.0),
                upper: (sales + z * sales_sd).max(0.0),
            },
            customers_interval: Interval {
                lower: (customers - z * customers_sd).max(0.0).floor() as u32,
                upper: (customers + z * customers_sd).max(0.0).ceil() as u32,
            },
        })
    }

    /// Serialize the whole model, fitted state included
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

fn predict_rows(model: &TargetModel, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
    rows.iter().map(|row| model.predict_row(row)).collect()
}

fn named_importances(columns: &[String], model: &TargetModel) -> Vec<FeatureImportance> {
    columns
        .iter()
        .zip(model.feature_importances())
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect()
}
