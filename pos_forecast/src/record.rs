//! Normalized point-of-sale rows and the closed weather vocabulary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the user owning a dataset and a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(id)
    }
}

/// Weather category of a trading day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    Sunny,
    Cloudy,
    Rainy,
    Sleet,
    Snow,
    Unknown,
}

impl WeatherCategory {
    /// Map a free-text label onto the closed category set.
    ///
    /// Accepts the POS export vocabulary (晴, 曇, ...), the forecast
    /// provider vocabulary (晴れ, 曇り, ...) and the canonical English names.
    /// Anything else, including an empty label, is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "晴" | "晴れ" | "sunny" => WeatherCategory::Sunny,
            "曇" | "曇り" | "cloudy" => WeatherCategory::Cloudy,
            "雨" | "rainy" => WeatherCategory::Rainy,
            "みぞれ" | "sleet" => WeatherCategory::Sleet,
            "雪" | "snow" => WeatherCategory::Snow,
            _ => WeatherCategory::Unknown,
        }
    }

    /// Integer encoding used as the `weather_code` feature
    pub fn code(self) -> i32 {
        match self {
            WeatherCategory::Sunny => 0,
            WeatherCategory::Cloudy => 1,
            WeatherCategory::Rainy => 2,
            WeatherCategory::Sleet => 3,
            WeatherCategory::Snow => 4,
            WeatherCategory::Unknown => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherCategory::Sunny => "sunny",
            WeatherCategory::Cloudy => "cloudy",
            WeatherCategory::Rainy => "rainy",
            WeatherCategory::Sleet => "sleet",
            WeatherCategory::Snow => "snow",
            WeatherCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized day of point-of-sale data.
///
/// Rows only exist with `sales > 0` and a known customer count; anything
/// else is dropped during ingestion and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub store_id: String,
    pub store_name: String,
    pub date: NaiveDate,
    pub weather: WeatherCategory,
    pub sales: f64,
    pub customers: u32,
    pub avg_spending: f64,
    pub target_achievement_rate: f64,
    pub yoy_ratio: f64,
    pub labor_cost_rate: f64,
    pub cost_rate: f64,
}

impl SalesRecord {
    /// Defaults for the optional columns, matching what gets persisted when
    /// an export leaves them blank
    pub const DEFAULT_STORE_ID: &'static str = "default";
    pub const DEFAULT_STORE_NAME: &'static str = "店舗名なし";
    pub const DEFAULT_TARGET_ACHIEVEMENT_RATE: f64 = 100.0;
    pub const DEFAULT_YOY_RATIO: f64 = 100.0;
    pub const DEFAULT_AVG_SPENDING: f64 = 0.0;
    pub const DEFAULT_LABOR_COST_RATE: f64 = 30.0;
    pub const DEFAULT_COST_RATE: f64 = 30.0;

    /// Minimal record with every optional column at its default
    pub fn new(date: NaiveDate, weather: WeatherCategory, sales: f64, customers: u32) -> Self {
        Self {
            store_id: Self::DEFAULT_STORE_ID.to_string(),
            store_name: Self::DEFAULT_STORE_NAME.to_string(),
            date,
            weather,
            sales,
            customers,
            avg_spending: Self::DEFAULT_AVG_SPENDING,
            target_achievement_rate: Self::DEFAULT_TARGET_ACHIEVEMENT_RATE,
            yoy_ratio: Self::DEFAULT_YOY_RATIO,
            labor_cost_rate: Self::DEFAULT_LABOR_COST_RATE,
            cost_rate: Self::DEFAULT_COST_RATE,
        }
    }
}
