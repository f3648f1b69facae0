use super::{tmp_path, DeletionReport};
use crate::error::{ForecastError, Result};
use crate::record::{SalesRecord, UserId};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const RECORDS_FILE: &str = "records.csv";

/// Each user's normalized rows, stored as one CSV file
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    /// Store rooted at `<storage_root>/datasets`
    pub fn new<P: AsRef<Path>>(storage_root: P) -> Self {
        Self {
            root: storage_root.as_ref().join("datasets"),
        }
    }

    fn user_dir(&self, user: UserId) -> PathBuf {
        self.root.join(user.to_string())
    }

    fn records_path(&self, user: UserId) -> PathBuf {
        self.user_dir(user).join(RECORDS_FILE)
    }

    /// Discard the user's rows and store `records` in their place
    pub fn replace(&self, user: UserId, records: &[SalesRecord]) -> Result<usize> {
        let path = self.records_path(user);
        let tmp = tmp_path(&path);

        let written = (|| -> Result<()> {
            fs::create_dir_all(self.user_dir(user))?;
            let mut writer = csv::Writer::from_path(&tmp)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
            drop(writer);
            fs::rename(&tmp, &path)?;
            Ok(())
        })();

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(ForecastError::storage(
                format!("replace dataset for user {}", user),
                err,
            ));
        }

        info!(user = %user, rows = records.len(), "replaced dataset");
        Ok(records.len())
    }

    /// Rows in stored order; empty when the user has none
    pub fn load(&self, user: UserId) -> Result<Vec<SalesRecord>> {
        let path = self.records_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<SalesRecord>, csv::Error>>()?;
        Ok(records)
    }

    /// Up to `limit` rows after skipping `skip`
    pub fn page(&self, user: UserId, skip: usize, limit: usize) -> Result<Vec<SalesRecord>> {
        let path = self.records_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let records = reader
            .deserialize()
            .skip(skip)
            .take(limit)
            .collect::<std::result::Result<Vec<SalesRecord>, csv::Error>>()?;
        Ok(records)
    }

    pub fn exists(&self, user: UserId) -> bool {
        self.records_path(user).is_file()
    }

    /// Remove the user's rows and, if empty, their directory
    pub fn delete(&self, user: UserId) -> DeletionReport {
        let mut report = DeletionReport::new(user);
        report.remove_file("dataset temp file", &tmp_path(&self.records_path(user)));
        report.remove_file("dataset", &self.records_path(user));
        report.remove_empty_dir("dataset directory", &self.user_dir(user));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WeatherCategory;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn rows(n: u32, base: f64) -> Vec<SalesRecord> {
        (1..=n)
            .map(|d| {
                SalesRecord::new(
                    NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    WeatherCategory::Rainy,
                    base + f64::from(d),
                    d,
                )
            })
            .collect()
    }

    #[test]
    fn test_round_trip_keeps_fields() {
        let dir = TempDir::new().unwrap();
        let store = DatasetStore::new(dir.path());
        let mut records = rows(3, 100.0);
        records[1].store_name = "渋谷店".to_string();

        store.replace(UserId(1), &records).unwrap();
        assert_eq!(store.load(UserId(1)).unwrap(), records);
        assert_eq!(store.page(UserId(1), 1, 5).unwrap(), records[1..].to_vec());
        assert!(store.load(UserId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_everything() {
        let dir = TempDir::new().unwrap();
        let store = DatasetStore::new(dir.path());
        store.replace(UserId(5), &rows(2, 10.0)).unwrap();

        let report = store.delete(UserId(5));
        assert!(report.is_complete());
        assert_eq!(report.removed, vec!["dataset", "dataset directory"]);
        assert!(!store.exists(UserId(5)));
        assert!(!dir.path().join("datasets").join("5").exists());
    }
}
