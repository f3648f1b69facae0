//! Per-user upload, train, predict and delete workflow
//!
//! [`ForecastService`] holds no model in memory: every call reads what it
//! needs from the stores under the user's lock, so different users never see
//! each other's state and a reader never observes a half-applied write.

use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::features::{build_training_set, prediction_features};
use crate::ingest;
use crate::models::{PredictionResult, SalesForecastModel, TrainingReport};
use crate::record::{SalesRecord, UserId};
use crate::stats::{DashboardStats, DatasetStats, DateRange, DetailedStats, ModelStatus, UploadSummary};
use crate::store::{DatasetStore, DeletionReport, ModelStore, UserLocks};
use crate::weather::WeatherObservation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

/// A single-day forecast together with the inputs it was made from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub date: NaiveDate,
    pub result: PredictionResult,
    pub weather: WeatherObservation,
    /// Made without any stored history; rolling figures were placeholders
    pub low_confidence: bool,
}

pub struct ForecastService {
    config: ForecastConfig,
    datasets: DatasetStore,
    models: ModelStore,
    locks: UserLocks,
}

impl ForecastService {
    /// Validate `config` and open the stores under its storage root
    pub fn open(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.storage_root).map_err(|err| {
            ForecastError::storage(
                format!("create storage root {}", config.storage_root.display()),
                err,
            )
        })?;
        info!(
            root = %config.storage_root.display(),
            strategy = %config.strategy,
            "opened forecast service"
        );

        Ok(Self {
            datasets: DatasetStore::new(&config.storage_root),
            models: ModelStore::new(&config.storage_root),
            locks: UserLocks::new(),
            config,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Number of users with a lock entry
    pub fn tracked_users(&self) -> usize {
        self.locks.len()
    }

    /// Normalize an export and make it the user's dataset.
    ///
    /// An export with no usable rows is rejected and the stored dataset is
    /// left as it was. An existing model is kept until the next `train`.
    pub fn upload(&self, user: UserId, bytes: &[u8]) -> Result<UploadSummary> {
        let upload = ingest::normalize(bytes)?;
        if upload.records.is_empty() {
            return Err(ForecastError::NoData(format!(
                "none of the {} uploaded rows were usable",
                upload.report.rows_read
            )));
        }
        let stats = DatasetStats::from_records(&upload.records)?;
        let date_range = DateRange::of(&upload.records)
            .ok_or_else(|| ForecastError::NoData("upload has no dated rows".to_string()))?;

        let lock = self.locks.for_user(user);
        let _guard = lock.write();
        let stored = self.datasets.replace(user, &upload.records)?;
        info!(
            user = %user,
            stored,
            dropped = upload.report.rows_dropped(),
            "uploaded dataset"
        );

        Ok(UploadSummary {
            records_count: stored,
            rows_dropped: upload.report.rows_dropped(),
            date_range,
            stats,
            ingest: upload.report,
        })
    }

    /// Train on the user's stored rows and persist the model.
    ///
    /// A storage error raised after the metadata commit means the new model
    /// is live but its predecessor's artifact could not be removed.
    pub fn train(&self, user: UserId) -> Result<TrainingReport> {
        let lock = self.locks.for_user(user);
        let _guard = lock.write();

        let records = self.datasets.load(user)?;
        if records.is_empty() {
            return Err(ForecastError::NoData(format!(
                "user {} has no uploaded data to train on",
                user
            )));
        }
        let (features, targets) = build_training_set(&records)?;

        let mut model = SalesForecastModel::new(&self.config);
        let report = model.train(&features, &targets)?;
        let metadata = self.models.replace(user, &model, model.strategy().as_str())?;
        info!(
            user = %user,
            generation = metadata.generation,
            samples = metadata.training_sample_count,
            "trained model"
        );

        Ok(report)
    }

    /// Forecast `date` under `weather` from the user's model and history
    pub fn predict(
        &self,
        user: UserId,
        date: NaiveDate,
        weather: &WeatherObservation,
    ) -> Result<PredictionOutcome> {
        let lock = self.locks.for_user(user);
        let _guard = lock.read();

        let model = self.models.load(user)?.ok_or_else(|| {
            ForecastError::ModelNotTrained(format!("user {} has no trained model", user))
        })?;
        let history = self.datasets.load(user)?;

        let features = prediction_features(date, weather, &history, &model.settings().prediction);
        if features.low_confidence {
            warn!(user = %user, %date, "predicting without stored history");
        }
        let result = model.predict(&features.frame)?;
        info!(
            user = %user,
            %date,
            sales = result.sales,
            customers = result.customers,
            "predicted"
        );

        Ok(PredictionOutcome {
            date,
            result,
            weather: weather.clone(),
            low_confidence: features.low_confidence,
        })
    }

    pub fn stats(&self, user: UserId) -> Result<DetailedStats> {
        let lock = self.locks.for_user(user);
        let _guard = lock.read();
        let records = self.datasets.load(user)?;
        if records.is_empty() {
            return Err(ForecastError::NoData(format!("user {} has no data", user)));
        }
        DetailedStats::from_records(&records)
    }

    pub fn dashboard(&self, user: UserId) -> Result<DashboardStats> {
        let lock = self.locks.for_user(user);
        let _guard = lock.read();
        let records = self.datasets.load(user)?;
        let status = self.status_unlocked(user, !records.is_empty())?;
        Ok(DashboardStats::from_records(&records, status))
    }

    pub fn status(&self, user: UserId) -> Result<ModelStatus> {
        let lock = self.locks.for_user(user);
        let _guard = lock.read();
        self.status_unlocked(user, self.datasets.exists(user))
    }

    fn status_unlocked(&self, user: UserId, data_loaded: bool) -> Result<ModelStatus> {
        let model_trained = self.models.has_model(user);
        let artifact_path = if model_trained {
            self.models.metadata(user)?.map(|m| m.artifact_path)
        } else {
            None
        };
        Ok(ModelStatus {
            model_trained,
            data_loaded,
            artifact_path,
        })
    }

    /// Stored rows, paginated
    pub fn records(&self, user: UserId, skip: usize, limit: usize) -> Result<Vec<SalesRecord>> {
        let lock = self.locks.for_user(user);
        let _guard = lock.read();
        self.datasets.page(user, skip, limit)
    }

    /// Remove the user's rows, model artifact and metadata.
    ///
    /// Every step is attempted; if any fails the error lists what was and
    /// was not removed. The user's lock entry is released afterwards unless
    /// another call still holds it.
    pub fn delete(&self, user: UserId) -> Result<DeletionReport> {
        let report = {
            let lock = self.locks.for_user(user);
            let _guard = lock.write();

            let mut report = self.models.delete(user);
            report.merge(self.datasets.delete(user));
            report
        };
        self.locks.prune(user);
        info!(
            user = %user,
            removed = report.removed.len(),
            failed = report.failed.len(),
            "deleted user data"
        );
        report.into_result()
    }
}
