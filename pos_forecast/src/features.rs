//! Feature engineering for the sales and customer regressors
//!
//! Training rows are derived from a date-sorted series of [`SalesRecord`]s:
//! calendar fields, a weather code, 7-row trailing means and 7-row lags.
//! Prediction rows reuse the calendar/weather derivation and synthesize the
//! rolling figures from the tail of the stored history.

use crate::calendar;
use crate::config::PredictionConfig;
use crate::error::{ForecastError, Result};
use crate::record::SalesRecord;
use crate::weather::WeatherObservation;
use chrono::{Datelike, NaiveDate};
use pos_math::{fill_gaps, lag, trailing_means};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Feature columns in the order every model is trained and queried with
pub const FEATURE_COLUMNS: [&str; 12] = [
    "year",
    "month",
    "day",
    "weekday",
    "is_weekend",
    "is_holiday",
    "weather_code",
    "season",
    "sales_ma7",
    "customers_ma7",
    "prev_week_sales",
    "prev_week_customers",
];

/// Trailing window for `sales_ma7` / `customers_ma7`
pub const ROLLING_WINDOW: usize = 7;
/// Row offset for `prev_week_sales` / `prev_week_customers`
pub const LAG_ROWS: usize = 7;
/// History rows consulted when synthesizing features for a prediction
pub const HISTORY_TAIL: usize = 30;

/// Derived features of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: u32,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub weather_code: i32,
    pub season: u32,
    pub sales_ma7: f64,
    pub customers_ma7: f64,
    pub prev_week_sales: f64,
    pub prev_week_customers: f64,
}

/// Rolling and lag figures attached to a calendar row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryFigures {
    pub sales_ma7: f64,
    pub customers_ma7: f64,
    pub prev_week_sales: f64,
    pub prev_week_customers: f64,
}

impl FeatureRow {
    /// Calendar and weather fields are pure functions of the date and label
    pub fn new(date: NaiveDate, weather_code: i32, history: HistoryFigures) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            weekday: calendar::weekday_index(date),
            is_weekend: calendar::is_weekend(date),
            is_holiday: calendar::is_public_holiday(date),
            weather_code,
            season: calendar::season(date.month()),
            sales_ma7: history.sales_ma7,
            customers_ma7: history.customers_ma7,
            prev_week_sales: history.prev_week_sales,
            prev_week_customers: history.prev_week_customers,
        }
    }

    /// Values in [`FEATURE_COLUMNS`] order
    pub fn values(&self) -> Vec<f64> {
        vec![
            f64::from(self.year),
            f64::from(self.month),
            f64::from(self.day),
            f64::from(self.weekday),
            if self.is_weekend { 1.0 } else { 0.0 },
            if self.is_holiday { 1.0 } else { 0.0 },
            f64::from(self.weather_code),
            f64::from(self.season),
            self.sales_ma7,
            self.customers_ma7,
            self.prev_week_sales,
            self.prev_week_customers,
        ]
    }
}

/// Named, row-major feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureFrame {
    /// Build a frame, checking every row has one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ForecastError::SchemaMismatch(format!(
                "row {} has {} values but there are {} columns",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Frame in [`FEATURE_COLUMNS`] order
    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        Self {
            columns: feature_columns(),
            rows: rows.iter().map(FeatureRow::values).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&[f64]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, if present
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Reindex to `columns`; extra columns are dropped, missing ones are an error
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        let mut indices = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for name in columns {
            match self.columns.iter().position(|c| c == name.as_ref()) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ForecastError::SchemaMismatch(format!(
                "missing feature column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&idx| row[idx]).collect())
                .collect(),
        })
    }
}

/// Training targets aligned with the rows of a [`FeatureFrame`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub sales: Vec<f64>,
    pub customers: Vec<f64>,
}

impl Targets {
    /// Number of rows; both target vectors must agree
    pub fn len(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }
}

/// Owned copy of [`FEATURE_COLUMNS`]
pub fn feature_columns() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Stable ascending sort by date
pub fn sort_by_date(records: &[SalesRecord]) -> Vec<&SalesRecord> {
    let mut sorted: Vec<&SalesRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.date);
    sorted
}

/// Derive one [`FeatureRow`] per record, in ascending date order
pub fn derive_rows(records: &[SalesRecord]) -> Result<Vec<FeatureRow>> {
    let sorted = sort_by_date(records);
    let sales: Vec<f64> = sorted.iter().map(|r| r.sales).collect();
    let customers: Vec<f64> = sorted.iter().map(|r| f64::from(r.customers)).collect();

    let sales_ma7 = trailing_means(&sales, ROLLING_WINDOW)?;
    let customers_ma7 = trailing_means(&customers, ROLLING_WINDOW)?;

    // A series too short to have any lagged value borrows the trailing mean
    let prev_week_sales =
        fill_gaps(&lag(&sales, LAG_ROWS)).unwrap_or_else(|| sales_ma7.clone());
    let prev_week_customers =
        fill_gaps(&lag(&customers, LAG_ROWS)).unwrap_or_else(|| customers_ma7.clone());

    Ok(sorted
        .iter()
        .enumerate()
        .map(|(i, record)| {
            FeatureRow::new(
                record.date,
                record.weather.code(),
                HistoryFigures {
                    sales_ma7: sales_ma7[i],
                    customers_ma7: customers_ma7[i],
                    prev_week_sales: prev_week_sales[i],
                    prev_week_customers: prev_week_customers[i],
                },
            )
        })
        .collect())
}

/// Feature matrix and targets for training
pub fn build_training_set(records: &[SalesRecord]) -> Result<(FeatureFrame, Targets)> {
    if records.is_empty() {
        return Err(ForecastError::NoData(
            "cannot build features from an empty dataset".to_string(),
        ));
    }

    let rows = derive_rows(records)?;
    let sorted = sort_by_date(records);
    let targets = Targets {
        sales: sorted.iter().map(|r| r.sales).collect(),
        customers: sorted.iter().map(|r| f64::from(r.customers)).collect(),
    };

    Ok((FeatureFrame::from_rows(&rows), targets))
}

/// Single-row features for a prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionFeatures {
    pub row: FeatureRow,
    pub frame: FeatureFrame,
    /// No history was available and the rolling figures are placeholders
    pub low_confidence: bool,
}

/// Features for `date` under `weather`, with rolling figures taken from `history`.
///
/// Rolling figures are the mean of the last [`HISTORY_TAIL`] rows; lag
/// figures are the value [`LAG_ROWS`] rows before the end of that tail, or
/// the mean when the tail is shorter. Without history the configured
/// placeholders are used and the result is flagged low-confidence.
pub fn prediction_features(
    date: NaiveDate,
    weather: &WeatherObservation,
    history: &[SalesRecord],
    defaults: &PredictionConfig,
) -> PredictionFeatures {
    let sorted = sort_by_date(history);
    let tail = &sorted[sorted.len().saturating_sub(HISTORY_TAIL)..];

    let (figures, low_confidence) = if tail.is_empty() {
        (
            HistoryFigures {
                sales_ma7: defaults.default_sales,
                customers_ma7: defaults.default_customers,
                prev_week_sales: defaults.default_sales,
                prev_week_customers: defaults.default_customers,
            },
            true,
        )
    } else {
        let sales_mean = tail.iter().map(|r| r.sales).mean();
        let customers_mean = tail.iter().map(|r| f64::from(r.customers)).mean();
        let lagged = tail.len().checked_sub(LAG_ROWS).map(|idx| tail[idx]);
        (
            HistoryFigures {
                sales_ma7: sales_mean,
                customers_ma7: customers_mean,
                prev_week_sales: lagged.map_or(sales_mean, |r| r.sales),
                prev_week_customers: lagged.map_or(customers_mean, |r| f64::from(r.customers)),
            },
            false,
        )
    };

    let row = FeatureRow::new(date, weather.code(), figures);
    let frame = FeatureFrame::from_rows(std::slice::from_ref(&row));
    PredictionFeatures {
        row,
        frame,
        low_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WeatherCategory;

    fn record(day: u32, sales: f64, customers: u32) -> SalesRecord {
        SalesRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            WeatherCategory::Sunny,
            sales,
            customers,
        )
    }

    #[test]
    fn test_three_row_rolling_windows() {
        let records = vec![record(3, 300.0, 30), record(1, 100.0, 10), record(2, 200.0, 20)];
        let rows = derive_rows(&records).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].sales_ma7, 100.0);
        assert_eq!(rows[1].sales_ma7, 150.0);
        assert_eq!(rows[2].sales_ma7, 200.0);
        assert_eq!(rows[2].customers_ma7, 20.0);

        // no row is 7 back from anything, so the lag borrows the trailing mean
        assert_eq!(rows[1].prev_week_sales, 150.0);
        for row in &rows {
            assert!(row.values().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_lag_is_back_filled() {
        let records: Vec<SalesRecord> =
            (1..=10).map(|d| record(d, f64::from(d) * 100.0, d)).collect();
        let rows = derive_rows(&records).unwrap();

        // rows 0..7 take the first real lag value (row 7 looks back at row 0)
        assert_eq!(rows[0].prev_week_sales, 100.0);
        assert_eq!(rows[6].prev_week_sales, 100.0);
        assert_eq!(rows[7].prev_week_sales, 100.0);
        assert_eq!(rows[9].prev_week_sales, 300.0);
        assert_eq!(rows[9].prev_week_customers, 3.0);
    }

    #[test]
    fn test_calendar_fields() {
        // 2024-06-01 is a Saturday
        let rows = derive_rows(&[record(1, 100.0, 10)]).unwrap();
        let row = &rows[0];
        assert_eq!((row.year, row.month, row.day), (2024, 6, 1));
        assert_eq!(row.weekday, 5);
        assert!(row.is_weekend);
        assert!(!row.is_holiday);
        assert_eq!(row.season, 1);
        assert_eq!(row.weather_code, 0);
    }

    #[test]
    fn test_select_reorders_and_rejects_missing() {
        let frame = FeatureFrame::new(
            vec!["b".to_string(), "a".to_string()],
            vec![vec![2.0, 1.0]],
        )
        .unwrap();

        let selected = frame.select(&["a", "b"]).unwrap();
        assert_eq!(selected.row(0).unwrap(), &[1.0, 2.0]);

        assert!(matches!(
            frame.select(&["a", "c"]),
            Err(ForecastError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_ragged_frame_rejected() {
        let result = FeatureFrame::new(vec!["a".to_string()], vec![vec![1.0, 2.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_prediction_without_history_is_low_confidence() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let features = prediction_features(
            date,
            &WeatherObservation::new("sunny", 25.0),
            &[],
            &PredictionConfig::default(),
        );

        assert!(features.low_confidence);
        assert_eq!(features.row.sales_ma7, 50_000.0);
        assert_eq!(features.row.prev_week_customers, 50.0);
        assert_eq!(features.frame.height(), 1);
    }

    #[test]
    fn test_prediction_uses_history_tail() {
        let history: Vec<SalesRecord> =
            (1..=10).map(|d| record(d, f64::from(d) * 100.0, d)).collect();
        let date = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
        let features = prediction_features(
            date,
            &WeatherObservation::new("雨", 18.0),
            &history,
            &PredictionConfig::default(),
        );

        assert!(!features.low_confidence);
        assert_eq!(features.row.weather_code, 2);
        assert_eq!(features.row.sales_ma7, 550.0);
        // 7 rows before the end of a 10-row tail is day 4
        assert_eq!(features.row.prev_week_sales, 400.0);
        assert_eq!(features.row.prev_week_customers, 4.0);
    }

    #[test]
    fn test_short_history_lag_falls_back_to_mean() {
        let history = vec![record(1, 100.0, 10), record(2, 300.0, 30)];
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let features = prediction_features(
            date,
            &WeatherObservation::new("sunny", 25.0),
            &history,
            &PredictionConfig::default(),
        );
        assert_eq!(features.row.prev_week_sales, 200.0);
        assert_eq!(features.row.prev_week_customers, 20.0);
    }

    #[test]
    fn test_unsorted_history_is_ordered_before_the_tail() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 27).unwrap();
        let ordered: Vec<SalesRecord> = (0..35u32)
            .map(|i| {
                SalesRecord::new(
                    start + chrono::Duration::days(i64::from(i)),
                    WeatherCategory::Sunny,
                    f64::from(i + 1) * 100.0,
                    i + 1,
                )
            })
            .collect();
        let mut shuffled = ordered.clone();
        shuffled.reverse();
        shuffled.rotate_left(11);

        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let weather = WeatherObservation::new("sunny", 25.0);
        let defaults = PredictionConfig::default();
        let from_sorted = prediction_features(date, &weather, &ordered, &defaults);
        let from_shuffled = prediction_features(date, &weather, &shuffled, &defaults);

        assert_eq!(from_shuffled.row, from_sorted.row);
        // tail is the latest 30 days, sales 600..=3500
        assert!((from_shuffled.row.sales_ma7 - 2050.0).abs() < 1e-9);
        assert_eq!(from_shuffled.row.prev_week_sales, 2900.0);
        assert_eq!(from_shuffled.row.prev_week_customers, 29.0);
    }
}
