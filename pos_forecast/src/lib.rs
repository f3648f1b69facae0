//! # POS Forecast
//!
//! Per-user sales and footfall forecasting from point-of-sale CSV exports.
//!
//! ## Features
//!
//! - Shift_JIS CSV ingestion with localized headers and row-level cleaning
//! - Calendar, Japanese public-holiday, weather, rolling and lag features
//! - Random forest or weighted forest/boosting/linear blend per target
//! - Hold-out metrics (MAE, MSE, RMSE, R², MAPE) and feature importances
//! - Filesystem stores for datasets and model artifacts with atomic replace
//! - Per-user locking around upload, train, predict and delete
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use pos_forecast::{ForecastConfig, ForecastService, UserId, WeatherObservation};
//!
//! let service = ForecastService::open(ForecastConfig::default().with_storage_root("data"))?;
//! let user = UserId(1);
//!
//! service.upload(user, &std::fs::read("sales.csv")?)?;
//! let report = service.train(user)?;
//! println!("sales R2: {:.3}", report.sales_metrics.r2);
//!
//! let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
//! let outcome = service.predict(user, date, &WeatherObservation::new("晴れ", 28.0))?;
//! println!("{} yen, {} customers", outcome.result.sales, outcome.result.customers);
//! # Ok::<(), pos_forecast::ForecastError>(())
//! ```

pub mod calendar;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod record;
pub mod scaler;
pub mod stats;
pub mod store;
pub mod utils;
pub mod weather;

// Re-export commonly used types
pub use crate::config::ForecastConfig;
pub use crate::error::{ForecastError, Result};
pub use crate::features::{FeatureFrame, Targets, FEATURE_COLUMNS};
pub use crate::models::{ModelStrategy, PredictionResult, SalesForecastModel, TrainingReport};
pub use crate::orchestrator::{ForecastService, PredictionOutcome};
pub use crate::record::{SalesRecord, UserId, WeatherCategory};
pub use crate::weather::WeatherObservation;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
