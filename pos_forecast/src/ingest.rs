//! CSV ingestion and normalization of point-of-sale exports
//!
//! Exports arrive as Shift_JIS encoded CSV with Japanese headers. The
//! normalizer decodes the bytes, renames the known headers to canonical
//! field names, coerces values, and drops rows that cannot become a valid
//! [`SalesRecord`]. Malformed rows never fail the whole document.

use crate::error::{ForecastError, Result};
use crate::record::{SalesRecord, WeatherCategory};
use chrono::NaiveDate;
use encoding_rs::SHIFT_JIS;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Localized header vocabulary and the canonical field each one maps to
pub const HEADER_VOCABULARY: [(&str, &str); 11] = [
    ("AKR", "store_id"),
    ("店舗名", "store_name"),
    ("日付", "date"),
    ("天気", "weather"),
    ("売上", "sales"),
    ("目標達成率", "target_achievement_rate"),
    ("前年同曜日比", "yoy_ratio"),
    ("客数", "customers"),
    ("客単価", "avg_spending"),
    ("人件費率", "labor_cost_rate"),
    ("原価率", "cost_rate"),
];

const REQUIRED_FIELDS: [&str; 3] = ["date", "sales", "customers"];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%Y年%m月%d日"];

/// Reason a single row was excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIssue {
    /// Date column empty or not a recognisable date
    InvalidDate,
    /// Sales column empty or not numeric
    MissingSales,
    /// Customer column empty or not numeric
    MissingCustomers,
    /// Sales of zero or below
    NonPositiveSales,
    /// Customer count below zero
    NegativeCustomers,
    /// Customer count with a fractional part or beyond `u32::MAX`
    InvalidCustomers,
    /// The CSV reader could not tokenise the row
    Unreadable,
}

/// What happened to the rows of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped: BTreeMap<RowIssue, usize>,
}

impl IngestReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    fn drop_row(&mut self, line: usize, issue: RowIssue) {
        debug!(line, ?issue, "dropping row");
        *self.dropped.entry(issue).or_insert(0) += 1;
    }
}

/// Normalized rows in original document order, plus the ingest report
#[derive(Debug, Clone)]
pub struct NormalizedUpload {
    pub records: Vec<SalesRecord>,
    pub report: IngestReport,
}

/// Decode Shift_JIS bytes, failing on any malformed sequence
pub fn decode_shift_jis(bytes: &[u8]) -> Result<String> {
    SHIFT_JIS
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            ForecastError::Decode("input is not valid Shift_JIS text".to_string())
        })
}

/// Map a header onto its canonical field name; unknown headers pass through
pub fn canonical_header(header: &str) -> &str {
    let header = header.trim().trim_start_matches('\u{feff}');
    HEADER_VOCABULARY
        .iter()
        .find(|(localized, _)| *localized == header)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(header)
}

/// Coerce a numeric cell; anything unparsable is missing
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(['¥', '￥'])
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a date cell, ignoring a trailing time of day
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Decode and normalize an uploaded export
pub fn normalize(bytes: &[u8]) -> Result<NormalizedUpload> {
    let text = decode_shift_jis(bytes)?;
    normalize_text(&text)
}

/// Normalize already-decoded CSV text
pub fn normalize_text(text: &str) -> Result<NormalizedUpload> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, header)| (canonical_header(header).to_string(), idx))
        .collect();

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !columns.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(ForecastError::SchemaMismatch(format!(
            "upload is missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let mut report = IngestReport::default();
    let mut records = Vec::new();

    for (idx, row) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        report.rows_read += 1;

        let row = match row {
            Ok(row) => row,
            Err(_) => {
                report.drop_row(line, RowIssue::Unreadable);
                continue;
            }
        };

        match normalize_row(&row, &columns) {
            Ok(record) => records.push(record),
            Err(issue) => report.drop_row(line, issue),
        }
    }

    report.rows_kept = records.len();
    info!(
        rows_read = report.rows_read,
        rows_kept = report.rows_kept,
        rows_dropped = report.rows_dropped(),
        "normalized upload"
    );

    Ok(NormalizedUpload { records, report })
}

/// Field access by canonical name over one raw row
struct RowView<'a> {
    row: &'a csv::StringRecord,
    columns: &'a HashMap<String, usize>,
}

impl<'a> RowView<'a> {
    fn text(&self, field: &str) -> Option<&'a str> {
        self.columns
            .get(field)
            .and_then(|&idx| self.row.get(idx))
            .filter(|value| !value.is_empty())
    }

    fn number(&self, field: &str) -> Option<f64> {
        self.text(field).and_then(parse_number)
    }
}

fn normalize_row(
    row: &csv::StringRecord,
    columns: &HashMap<String, usize>,
) -> std::result::Result<SalesRecord, RowIssue> {
    let view = RowView { row, columns };

    let date = view
        .text("date")
        .and_then(parse_date)
        .ok_or(RowIssue::InvalidDate)?;
    let sales = view.number("sales").ok_or(RowIssue::MissingSales)?;
    let customers = view.number("customers").ok_or(RowIssue::MissingCustomers)?;
    if sales <= 0.0 {
        return Err(RowIssue::NonPositiveSales);
    }
    if customers < 0.0 {
        return Err(RowIssue::NegativeCustomers);
    }
    if customers.fract() != 0.0 || customers > f64::from(u32::MAX) {
        return Err(RowIssue::InvalidCustomers);
    }

    Ok(SalesRecord {
        store_id: view
            .text("store_id")
            .unwrap_or(SalesRecord::DEFAULT_STORE_ID)
            .to_string(),
        store_name: view
            .text("store_name")
            .unwrap_or(SalesRecord::DEFAULT_STORE_NAME)
            .to_string(),
        date,
        weather: view
            .text("weather")
            .map(WeatherCategory::from_label)
            .unwrap_or(WeatherCategory::Unknown),
        sales,
        customers: customers as u32,
        avg_spending: view
            .number("avg_spending")
            .unwrap_or(SalesRecord::DEFAULT_AVG_SPENDING),
        target_achievement_rate: view
            .number("target_achievement_rate")
            .unwrap_or(SalesRecord::DEFAULT_TARGET_ACHIEVEMENT_RATE),
        yoy_ratio: view
            .number("yoy_ratio")
            .unwrap_or(SalesRecord::DEFAULT_YOY_RATIO),
        labor_cost_rate: view
            .number("labor_cost_rate")
            .unwrap_or(SalesRecord::DEFAULT_LABOR_COST_RATE),
        cost_rate: view
            .number("cost_rate")
            .unwrap_or(SalesRecord::DEFAULT_COST_RATE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12345", Some(12345.0))]
    #[case(" 1,234.5 ", Some(1234.5))]
    #[case("¥98,000", Some(98000.0))]
    #[case("97.5%", Some(97.5))]
    #[case("", None)]
    #[case("n/a", None)]
    #[case("NaN", None)]
    fn test_parse_number(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(raw), expected);
    }

    #[rstest]
    #[case("2024-01-05")]
    #[case("2024/01/05")]
    #[case("2024/1/5")]
    #[case("2024.01.05")]
    #[case("20240105")]
    #[case("2024年1月5日")]
    #[case("2024-01-05 00:00:00")]
    fn test_parse_date_formats(#[case] raw: &str) {
        assert_eq!(parse_date(raw), NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("tomorrow"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_canonical_header() {
        assert_eq!(canonical_header("売上"), "sales");
        assert_eq!(canonical_header(" 客数 "), "customers");
        assert_eq!(canonical_header("\u{feff}AKR"), "store_id");
        assert_eq!(canonical_header("memo"), "memo");
    }

    #[test]
    fn test_invalid_shift_jis_is_a_decode_error() {
        // 0x81 opens a double-byte sequence that 0x20 cannot complete
        let result = decode_shift_jis(&[0x81, 0x20]);
        assert!(matches!(result, Err(ForecastError::Decode(_))));
    }

    #[test]
    fn test_rows_are_dropped_not_fatal() {
        let text = "日付,天気,売上,客数\n\
                    2024-01-01,晴,1000,10\n\
                    2024-01-02,雨,0,12\n\
                    2024-01-03,雪,abc,12\n\
                    2024-01-04,曇,1500,\n\
                    not-a-date,晴,1000,10\n\
                    2024-01-06,嵐,2000,20\n";

        let upload = normalize_text(text).unwrap();
        assert_eq!(upload.report.rows_read, 6);
        assert_eq!(upload.records.len(), 2);
        assert_eq!(upload.report.rows_dropped(), 4);
        assert_eq!(upload.report.dropped[&RowIssue::NonPositiveSales], 1);
        assert_eq!(upload.report.dropped[&RowIssue::MissingSales], 1);
        assert_eq!(upload.report.dropped[&RowIssue::MissingCustomers], 1);
        assert_eq!(upload.report.dropped[&RowIssue::InvalidDate], 1);

        assert_eq!(upload.records[0].weather, WeatherCategory::Sunny);
        assert_eq!(upload.records[1].weather, WeatherCategory::Unknown);
        assert_eq!(upload.records[1].store_id, SalesRecord::DEFAULT_STORE_ID);
        assert_eq!(upload.records[1].labor_cost_rate, 30.0);
    }

    #[rstest]
    #[case("-3", RowIssue::NegativeCustomers)]
    #[case("12.7", RowIssue::InvalidCustomers)]
    #[case("4294967296", RowIssue::InvalidCustomers)]
    fn test_unusable_customer_counts(#[case] customers: &str, #[case] issue: RowIssue) {
        let text = format!("日付,売上,客数\n2024-01-01,1000,{}\n2024-01-02,1200,12\n", customers);
        let upload = normalize_text(&text).unwrap();

        assert_eq!(upload.report.dropped.get(&issue), Some(&1));
        assert_eq!(upload.records.len(), 1);
        assert_eq!(upload.records[0].customers, 12);
    }

    #[test]
    fn test_missing_required_header() {
        let result = normalize_text("日付,天気,売上\n2024-01-01,晴,1000\n");
        assert!(matches!(result, Err(ForecastError::SchemaMismatch(_))));
    }
}
