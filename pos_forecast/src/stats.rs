//! Descriptive statistics over a user's stored rows

use crate::calendar;
use crate::error::{ForecastError, Result};
use crate::ingest::IngestReport;
use crate::record::{SalesRecord, WeatherCategory};
use chrono::{Datelike, NaiveDate};
use pos_math::Summary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// First and last date covered by a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn of(records: &[SalesRecord]) -> Option<Self> {
        let start = records.iter().map(|r| r.date).min()?;
        let end = records.iter().map(|r| r.date).max()?;
        Some(Self { start, end })
    }
}

/// Counts and summaries of the sales and customer columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_records: usize,
    pub sales: Summary,
    pub customers: Summary,
    pub weather_distribution: BTreeMap<WeatherCategory, usize>,
}

impl DatasetStats {
    pub fn from_records(records: &[SalesRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(ForecastError::NoData("no records to summarize".to_string()));
        }
        let sales: Vec<f64> = records.iter().map(|r| r.sales).collect();
        let customers: Vec<f64> = records.iter().map(|r| f64::from(r.customers)).collect();

        let mut weather_distribution = BTreeMap::new();
        for record in records {
            *weather_distribution.entry(record.weather).or_insert(0) += 1;
        }

        Ok(Self {
            total_records: records.len(),
            sales: Summary::from_values(&sales)?,
            customers: Summary::from_values(&customers)?,
            weather_distribution,
        })
    }
}

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub records_count: usize,
    pub rows_dropped: usize,
    pub date_range: DateRange,
    pub stats: DatasetStats,
    pub ingest: IngestReport,
}

/// Mean sales on holidays versus regular days; `None` when a group is empty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HolidayImpact {
    pub holiday_avg: Option<f64>,
    pub regular_avg: Option<f64>,
}

/// Breakdown of mean sales by calendar and weather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedStats {
    pub date_range: DateRange,
    pub basic: DatasetStats,
    /// Month of year (1-12) to mean sales
    pub monthly_sales: BTreeMap<u32, f64>,
    /// Weekday (Monday = 0) to mean sales
    pub weekday_sales: BTreeMap<u32, f64>,
    pub weather_impact: BTreeMap<WeatherCategory, f64>,
    pub holiday_impact: HolidayImpact,
}

impl DetailedStats {
    pub fn from_records(records: &[SalesRecord]) -> Result<Self> {
        let basic = DatasetStats::from_records(records)?;
        let date_range = DateRange::of(records)
            .ok_or_else(|| ForecastError::NoData("no records to summarize".to_string()))?;

        let (holidays, regular): (Vec<&SalesRecord>, Vec<&SalesRecord>) = records
            .iter()
            .partition(|r| calendar::is_public_holiday(r.date));

        Ok(Self {
            date_range,
            basic,
            monthly_sales: mean_sales_by(records, |r| r.date.month()),
            weekday_sales: mean_sales_by(records, |r| calendar::weekday_index(r.date)),
            weather_impact: mean_sales_by(records, |r| r.weather),
            holiday_impact: HolidayImpact {
                holiday_avg: mean_of(holidays.iter().map(|r| r.sales)),
                regular_avg: mean_of(regular.iter().map(|r| r.sales)),
            },
        })
    }
}

/// Mean sales of one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    /// `YYYY-MM`
    pub month: String,
    pub avg_sales: f64,
}

/// Whether a user has data and a usable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_trained: bool,
    pub data_loaded: bool,
    pub artifact_path: Option<PathBuf>,
}

/// Overview for a user's landing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_data_points: usize,
    pub date_range: Option<DateRange>,
    pub model_status: ModelStatus,
    pub sales_trend: Vec<MonthlySales>,
    pub weather_impact: BTreeMap<WeatherCategory, f64>,
}

impl DashboardStats {
    pub fn from_records(records: &[SalesRecord], model_status: ModelStatus) -> Self {
        let sales_trend = mean_sales_by(records, |r| (r.date.year(), r.date.month()))
            .into_iter()
            .map(|((year, month), avg_sales)| MonthlySales {
                month: format!("{:04}-{:02}", year, month),
                avg_sales,
            })
            .collect();

        Self {
            total_data_points: records.len(),
            date_range: DateRange::of(records),
            model_status,
            sales_trend,
            weather_impact: mean_sales_by(records, |r| r.weather),
        }
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn mean_sales_by<K, F>(records: &[SalesRecord], key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&SalesRecord) -> K,
{
    let mut groups: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(key(record)).or_insert((0.0, 0));
        entry.0 += record.sales;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(k, (sum, count))| (k, sum / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(y: i32, m: u32, d: u32, weather: WeatherCategory, sales: f64) -> SalesRecord {
        SalesRecord::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), weather, sales, 10)
    }

    fn sample() -> Vec<SalesRecord> {
        vec![
            record(2024, 1, 1, WeatherCategory::Sunny, 300.0), // New Year's Day, Monday
            record(2024, 1, 2, WeatherCategory::Rainy, 100.0),
            record(2024, 1, 9, WeatherCategory::Sunny, 200.0),
            record(2024, 2, 6, WeatherCategory::Snow, 50.0),
        ]
    }

    #[test]
    fn test_detailed_stats() {
        let stats = DetailedStats::from_records(&sample()).unwrap();

        assert_eq!(stats.date_range.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(stats.date_range.end, NaiveDate::from_ymd_opt(2024, 2, 6).unwrap());
        assert_eq!(stats.monthly_sales[&1], 200.0);
        assert_eq!(stats.monthly_sales[&2], 50.0);
        assert_eq!(stats.weekday_sales[&0], 300.0);
        assert_eq!(stats.weekday_sales[&1], 350.0 / 3.0);
        assert_eq!(stats.weather_impact[&WeatherCategory::Sunny], 250.0);
        assert_eq!(stats.holiday_impact.holiday_avg, Some(300.0));
        assert_eq!(stats.holiday_impact.regular_avg, Some(350.0 / 3.0));
        assert_eq!(stats.basic.weather_distribution[&WeatherCategory::Sunny], 2);
    }

    #[test]
    fn test_dashboard_trend_is_monthly() {
        let status = ModelStatus {
            model_trained: false,
            data_loaded: true,
            artifact_path: None,
        };
        let dashboard = DashboardStats::from_records(&sample(), status);

        assert_eq!(dashboard.total_data_points, 4);
        assert_eq!(
            dashboard.sales_trend,
            vec![
                MonthlySales {
                    month: "2024-01".to_string(),
                    avg_sales: 200.0
                },
                MonthlySales {
                    month: "2024-02".to_string(),
                    avg_sales: 50.0
                },
            ]
        );
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            DetailedStats::from_records(&[]),
            Err(ForecastError::NoData(_))
        ));
        let dashboard = DashboardStats::from_records(
            &[],
            ModelStatus {
                model_trained: false,
                data_loaded: false,
                artifact_path: None,
            },
        );
        assert_eq!(dashboard.date_range, None);
        assert!(dashboard.sales_trend.is_empty());
    }
}
