use super::{tmp_path, write_atomically, DeletionReport};
use crate::error::{ForecastError, Result};
use crate::models::SalesForecastModel;
use crate::record::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const METADATA_FILE: &str = "metadata.json";

/// The single live model record of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModelMetadata {
    pub user_id: UserId,
    pub model_name: String,
    pub artifact_path: PathBuf,
    /// Training report serialized as JSON
    pub metrics: String,
    pub training_sample_count: usize,
    /// Bumped on every retrain; names the artifact file
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Each user's trained model artifact plus its metadata.
///
/// The metadata file is the commit point: a new artifact is written under a
/// fresh generation name, then the metadata is renamed over the old one, and
/// only then is the superseded artifact removed.
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    /// Store rooted at `<storage_root>/models`
    pub fn new<P: AsRef<Path>>(storage_root: P) -> Self {
        Self {
            root: storage_root.as_ref().join("models"),
        }
    }

    fn user_dir(&self, user: UserId) -> PathBuf {
        self.root.join(user.to_string())
    }

    fn metadata_path(&self, user: UserId) -> PathBuf {
        self.user_dir(user).join(METADATA_FILE)
    }

    fn artifact_path(&self, user: UserId, generation: u64) -> PathBuf {
        self.user_dir(user).join(format!("model-{}.json", generation))
    }

    /// Persist `model` as the user's live model.
    ///
    /// Fails with [`ForecastError::Storage`] if the superseded artifact cannot
    /// be removed after the commit; the new generation is live in that case.
    pub fn replace(
        &self,
        user: UserId,
        model: &SalesForecastModel,
        model_name: &str,
    ) -> Result<UserModelMetadata> {
        let report = model.report().ok_or_else(|| {
            ForecastError::ModelNotTrained("only trained models can be stored".to_string())
        })?;
        let previous = self.metadata(user)?;
        let generation = previous.as_ref().map_or(1, |m| m.generation + 1);
        let artifact_path = self.artifact_path(user, generation);

        write_atomically(&artifact_path, &model.to_bytes()?)?;

        let now = Utc::now();
        let metadata = UserModelMetadata {
            user_id: user,
            model_name: model_name.to_string(),
            artifact_path: artifact_path.clone(),
            metrics: serde_json::to_string(report)?,
            training_sample_count: report.training_samples + report.test_samples,
            generation,
            created_at: previous.as_ref().map_or(now, |m| m.created_at),
            updated_at: now,
        };

        let committed = serde_json::to_vec_pretty(&metadata)
            .map_err(ForecastError::from)
            .and_then(|bytes| write_atomically(&self.metadata_path(user), &bytes));
        if let Err(err) = committed {
            if let Err(cleanup) = fs::remove_file(&artifact_path) {
                return Err(ForecastError::storage(
                    format!("commit model metadata for user {}", user),
                    format!(
                        "{}; uncommitted artifact {} was left behind: {}",
                        err,
                        artifact_path.display(),
                        cleanup
                    ),
                ));
            }
            return Err(err);
        }

        // generation is live from here on; a leftover artifact is still an error
        if let Some(old) = previous.filter(|m| m.artifact_path != artifact_path) {
            match fs::remove_file(&old.artifact_path) {
                Err(err) if err.kind() != ErrorKind::NotFound => {
                    warn!(
                        user = %user,
                        path = %old.artifact_path.display(),
                        error = %err,
                        "could not remove superseded model artifact"
                    );
                    return Err(ForecastError::storage(
                        format!("remove superseded model artifact for user {}", user),
                        format!(
                            "generation {} is live but {} was left behind: {}",
                            generation,
                            old.artifact_path.display(),
                            err
                        ),
                    ));
                }
                _ => {}
            }
        }

        info!(user = %user, generation, model = model_name, "stored model");
        Ok(metadata)
    }

    pub fn metadata(&self, user: UserId) -> Result<Option<UserModelMetadata>> {
        let path = self.metadata_path(user);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// The user's live model, if both its metadata and artifact exist
    pub fn load(&self, user: UserId) -> Result<Option<SalesForecastModel>> {
        let Some(metadata) = self.metadata(user)? else {
            return Ok(None);
        };
        if !metadata.artifact_path.is_file() {
            warn!(
                user = %user,
                path = %metadata.artifact_path.display(),
                "model metadata points at a missing artifact"
            );
            return Ok(None);
        }
        let bytes = fs::read(&metadata.artifact_path)?;
        Ok(Some(SalesForecastModel::from_bytes(&bytes)?))
    }

    pub fn has_model(&self, user: UserId) -> bool {
        matches!(self.metadata(user), Ok(Some(m)) if m.artifact_path.is_file())
    }

    /// Remove the metadata first so the model stops being visible, then every artifact
    pub fn delete(&self, user: UserId) -> DeletionReport {
        let mut report = DeletionReport::new(user);
        let dir = self.user_dir(user);
        let metadata_path = self.metadata_path(user);

        report.remove_file("model metadata temp file", &tmp_path(&metadata_path));
        report.remove_file("model metadata", &metadata_path);

        if let Ok(entries) = fs::read_dir(&dir) {
            let mut artifacts: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .map_or(false, |n| n.starts_with("model-"))
                })
                .collect();
            artifacts.sort();
            for path in artifacts {
                report.remove_file("model artifact", &path);
            }
        }

        report.remove_empty_dir("model directory", &dir);
        report
    }
}
