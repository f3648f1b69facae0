mod common;

use common::{june_csv, shift_jis, HEADER};
use pos_forecast::ingest::{normalize, normalize_text, RowIssue};
use pos_forecast::{ForecastError, WeatherCategory};
use pretty_assertions::assert_eq;

#[test]
fn test_thirty_day_export() {
    let upload = normalize(&shift_jis(&june_csv(30))).unwrap();

    assert_eq!(upload.records.len(), 30);
    assert_eq!(upload.report.rows_read, 30);
    assert_eq!(upload.report.rows_dropped(), 0);
    assert!(upload.records.iter().all(|r| r.sales > 0.0));

    let first = &upload.records[0];
    assert_eq!(first.store_id, "S001");
    assert_eq!(first.store_name, "渋谷店");
    assert_eq!(first.weather, WeatherCategory::Sunny);
    assert_eq!(first.target_achievement_rate, 98.5);
    assert_eq!(first.yoy_ratio, 102.3);
    assert_eq!(first.labor_cost_rate, 28.0);
    assert_eq!(first.cost_rate, 31.5);
    assert_eq!(upload.records[4].weather, WeatherCategory::Rainy);
    assert_eq!(upload.records[6].weather, WeatherCategory::Cloudy);
}

#[test]
fn test_zero_sales_row_is_dropped() {
    let text = format!(
        "{}\n\
         S001,渋谷店,2024/06/01,晴,50000,100,100,120,416,30,30\n\
         S001,渋谷店,2024/06/02,晴,0,100,100,80,0,30,30\n\
         S001,渋谷店,2024/06/03,雨,42000,100,100,95,442,30,30\n",
        HEADER
    );
    let upload = normalize(&shift_jis(&text)).unwrap();

    assert_eq!(upload.records.len(), 2);
    assert_eq!(upload.report.rows_read, 3);
    assert_eq!(upload.report.dropped.get(&RowIssue::NonPositiveSales), Some(&1));
    assert!(upload.records.iter().all(|r| r.sales > 0.0));
}

#[test]
fn test_rows_keep_document_order() {
    let text = format!(
        "{}\n\
         S001,渋谷店,2024/06/03,晴,3000,,,30,,,\n\
         S001,渋谷店,2024/06/01,晴,1000,,,10,,,\n\
         S001,渋谷店,2024/06/02,晴,2000,,,20,,,\n",
        HEADER
    );
    let upload = normalize_text(&text).unwrap();
    let sales: Vec<f64> = upload.records.iter().map(|r| r.sales).collect();
    assert_eq!(sales, vec![3000.0, 1000.0, 2000.0]);
    // blank optional columns fall back to the persisted defaults
    assert_eq!(upload.records[0].yoy_ratio, 100.0);
    assert_eq!(upload.records[0].avg_spending, 0.0);
}

#[test]
fn test_canonical_headers_and_extra_columns() {
    let text = "date,sales,customers,weather,memo\n\
                2024-06-01,1200,12,snow,closed early\n";
    let upload = normalize_text(text).unwrap();
    assert_eq!(upload.records.len(), 1);
    assert_eq!(upload.records[0].weather, WeatherCategory::Snow);
}

#[test]
fn test_invalid_encoding_is_rejected() {
    let mut bytes = shift_jis(&june_csv(3));
    // a lead byte followed by a byte that cannot trail it
    bytes.extend_from_slice(&[0x82, 0x0a]);
    assert!(matches!(normalize(&bytes), Err(ForecastError::Decode(_))));
}

#[test]
fn test_header_without_sales_is_a_schema_error() {
    let bytes = shift_jis("日付,天気,客数\n2024/06/01,晴,10\n");
    assert!(matches!(
        normalize(&bytes),
        Err(ForecastError::SchemaMismatch(_))
    ));
}
