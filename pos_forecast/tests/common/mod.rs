#![allow(dead_code)]

use chrono::{Datelike, NaiveDate};
use pos_forecast::ingest::normalize_text;
use pos_forecast::{ForecastConfig, SalesRecord};
use std::path::Path;

pub const HEADER: &str =
    "AKR,店舗名,日付,天気,売上,目標達成率,前年同曜日比,客数,客単価,人件費率,原価率";

/// One row per day of June 2024, mostly fine weather, busier at weekends
pub fn june_csv(days: u32) -> String {
    let mut text = String::from(HEADER);
    text.push('\n');
    for day in 1..=days {
        let date = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        let weekend = date.weekday().num_days_from_monday() >= 5;
        let weather = if day % 5 == 0 {
            "雨"
        } else if day % 7 == 0 {
            "曇"
        } else {
            "晴"
        };
        let sales = 50_000 + day * 1_000 + if weekend { 20_000 } else { 0 };
        let customers = 100 + day * 2 + if weekend { 40 } else { 0 };
        text.push_str(&format!(
            "S001,渋谷店,{},{},{},98.5,102.3,{},{},28.0,31.5\n",
            date.format("%Y/%m/%d"),
            weather,
            sales,
            customers,
            sales / customers
        ));
    }
    text
}

pub fn shift_jis(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
    assert!(!had_errors, "test text must be representable in Shift_JIS");
    bytes.into_owned()
}

pub fn june_records(days: u32) -> Vec<SalesRecord> {
    normalize_text(&june_csv(days)).unwrap().records
}

/// Stock configuration with smaller ensembles to keep tests fast
pub fn test_config(root: &Path) -> ForecastConfig {
    let mut config = ForecastConfig::default().with_storage_root(root);
    config.forest.n_estimators = 30;
    config.blend.forest.n_estimators = 20;
    config.blend.boosting.n_estimators = 30;
    config
}
