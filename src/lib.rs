//! # POS Forecast Workspace
//!
//! Umbrella crate over the workspace members:
//!
//! - [`forecast`]: ingestion, features, models, stores and the per-user service
//! - [`math`]: trailing means, lags, gap filling and summary statistics
//!
//! ## Example
//!
//! ```
//! use pos_forecast_workspace::math::trailing_means;
//!
//! let means = trailing_means(&[100.0, 200.0, 300.0], 7).unwrap();
//! assert_eq!(means, vec![100.0, 150.0, 200.0]);
//! ```

pub use pos_forecast as forecast;
pub use pos_math as math;

pub use pos_forecast::{ForecastConfig, ForecastError, ForecastService, UserId, WeatherObservation};

/// Crate versions of the workspace members
pub fn versions() -> [(&'static str, &'static str); 2] {
    [
        (pos_forecast::NAME, pos_forecast::VERSION),
        (pos_math::NAME, pos_math::VERSION),
    ]
}
