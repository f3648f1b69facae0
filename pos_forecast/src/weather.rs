//! Weather observations supplied by an external forecast provider
//!
//! Only the label and the temperature matter to the model; any other keys
//! the provider sends (location, precipitation, ...) are carried along
//! untouched so they can be echoed back with a prediction.

use crate::error::{ForecastError, Result};
use crate::record::WeatherCategory;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Temperature assumed when the provider omits one
pub const DEFAULT_TEMPERATURE: f64 = 20.0;

/// Forecast for the target day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Free-text label such as "晴れ" or "sunny"
    #[serde(default)]
    pub weather: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Remaining provider fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl WeatherObservation {
    pub fn new(weather: impl Into<String>, temperature: f64) -> Self {
        Self {
            weather: weather.into(),
            temperature,
            extra: Map::new(),
        }
    }

    /// Forecast used when the provider is unreachable: fine weather at 20°C
    pub fn fallback() -> Self {
        let mut observation = Self::new("晴れ", DEFAULT_TEMPERATURE);
        observation
            .extra
            .insert("source".to_string(), Value::String("default".to_string()));
        observation
    }

    /// Build from a provider mapping
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ForecastError::InvalidParameter(
                "weather observation must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn category(&self) -> WeatherCategory {
        WeatherCategory::from_label(&self.weather)
    }

    /// Feature encoding of the label; unrecognised labels are -1
    pub fn code(&self) -> i32 {
        self.category().code()
    }
}
