//! # POS Math
//!
//! Numeric building blocks for point-of-sale time series.
//! This crate provides the trailing means, index lags, gap filling and
//! summary statistics that the forecasting pipeline derives its features from.

use thiserror::Error;

pub mod fill;
pub mod rolling;
pub mod summary;

pub use fill::{back_fill, fill_gaps, forward_fill};
pub use rolling::{lag, trailing_means, TrailingMean};
pub use summary::{population_std_dev, Summary};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
