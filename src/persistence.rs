// Persistence gateway: the dataset's transaction boundary.
//
// The whole dataset (points + history + taxonomy) is one document. A
// commit replaces the document atomically or fails; readers never see a
// partial write. The trait keeps the record store ignorant of where the
// document lives, so a real transactional backend can slot in later.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::store::Dataset;

pub trait PersistenceGateway {
    /// Read the current dataset document.
    fn load(&self) -> Result<Dataset>;

    /// Durably replace the dataset document with `dataset`.
    fn commit(&self, dataset: &Dataset) -> Result<()>;
}

/// Stores the dataset as one pretty-printed JSON file. Commits go through
/// a temp file in the same directory followed by a rename, so a crash
/// mid-write leaves the previous document intact.
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileGateway { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PersistenceGateway for JsonFileGateway {
    fn load(&self) -> Result<Dataset> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            StoreError::persistence(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::persistence(format!("cannot parse {}: {}", self.path.display(), e))
        })
    }

    fn commit(&self, dataset: &Dataset) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::persistence(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let document = serde_json::to_string_pretty(dataset)
            .map_err(|e| StoreError::persistence(format!("cannot serialize dataset: {}", e)))?;

        let temp = self.temp_path();
        fs::write(&temp, document).map_err(|e| {
            StoreError::persistence(format!("cannot write {}: {}", temp.display(), e))
        })?;
        fs::rename(&temp, &self.path).map_err(|e| {
            StoreError::persistence(format!("cannot replace {}: {}", self.path.display(), e))
        })
    }
}

/// Keeps the dataset in memory. Used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryGateway {
    document: Mutex<Option<Dataset>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        MemoryGateway::default()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self) -> Result<Dataset> {
        self.document
            .lock()
            .expect("gateway lock poisoned")
            .clone()
            .ok_or_else(|| StoreError::persistence("no dataset committed yet"))
    }

    fn commit(&self, dataset: &Dataset) -> Result<()> {
        *self.document.lock().expect("gateway lock poisoned") = Some(dataset.clone());
        Ok(())
    }
}
