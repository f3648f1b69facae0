//! Error types for the pos_forecast crate

use thiserror::Error;

/// Custom error types for the pos_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Upload bytes are not valid Shift_JIS text
    #[error("Decode error: {0}")]
    Decode(String),

    /// Fewer rows than the model needs to train
    #[error("Insufficient data: at least {required} rows are required for training, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Prediction requested before any model was trained
    #[error("Model not trained: {0}")]
    ModelNotTrained(String),

    /// A user has no stored data for the requested operation
    #[error("No data: {0}")]
    NoData(String),

    /// Columns do not match what the pipeline or the trained model expects
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised while fitting or evaluating a regressor
    #[error("Model error: {0}")]
    ModelError(String),

    /// A persistence step failed; the detail names any state left behind
    #[error("Storage error during {operation}: {detail}")]
    Storage { operation: String, detail: String },

    /// Deletion removed some of a user's state but not all of it
    #[error("Partial delete for user {user_id}: removed [{}], failed [{}]", .removed.join(", "), .failed.join(", "))]
    PartialDelete {
        user_id: String,
        removed: Vec<String>,
        failed: Vec<String>,
    },

    /// Error from configuration loading
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Error from series math
    #[error("Math error: {0}")]
    MathError(#[from] pos_math::MathError),
}

impl ForecastError {
    /// Shorthand for a storage failure
    pub fn storage(operation: impl Into<String>, detail: impl ToString) -> Self {
        ForecastError::Storage {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
