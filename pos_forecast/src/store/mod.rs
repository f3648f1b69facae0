//! Filesystem-backed per-user state
//!
//! Layout under the storage root:
//!
//! ```text
//! datasets/<user>/records.csv
//! models/<user>/model-<generation>.json
//! models/<user>/metadata.json
//! ```
//!
//! Each user owns exactly one dataset and at most one live model. Writes go
//! to a temporary file first and are renamed into place, so readers see the
//! old state or the new state and never a half-written file.

mod dataset;
mod locks;
mod model;

pub use dataset::DatasetStore;
pub use locks::UserLocks;
pub use model::{ModelStore, UserModelMetadata};

use crate::error::{ForecastError, Result};
use crate::record::UserId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// What a delete removed and what it could not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub user_id: UserId,
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

impl DeletionReport {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            removed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Every attempted step succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: DeletionReport) {
        self.removed.extend(other.removed);
        self.failed.extend(other.failed);
    }

    /// `Ok` when complete, otherwise a [`ForecastError::PartialDelete`] naming every step
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(ForecastError::PartialDelete {
            user_id: self.user_id.to_string(),
            removed: self.removed,
            failed: self.failed,
        })
    }

    /// Remove a file if present
    pub(crate) fn remove_file(&mut self, label: &str, path: &Path) {
        if !path.exists() {
            return;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed {}", label);
                self.removed.push(label.to_string());
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove {}", label);
                self.failed.push(format!("{}: {}", label, err));
            }
        }
    }

    /// Remove a directory if present and empty
    pub(crate) fn remove_empty_dir(&mut self, label: &str, path: &Path) {
        let is_empty = match fs::read_dir(path) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => return,
        };
        if !is_empty {
            self.failed
                .push(format!("{}: directory {} is not empty", label, path.display()));
            return;
        }
        match fs::remove_dir(path) {
            Ok(()) => self.removed.push(label.to_string()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove {}", label);
                self.failed.push(format!("{}: {}", label, err));
            }
        }
    }
}

/// Write `bytes` next to `path` and rename over it
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    let written = (|| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    written.map_err(|err| {
        let _ = fs::remove_file(&tmp);
        ForecastError::storage(format!("write {}", path.display()), err)
    })
}

pub(crate) fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
