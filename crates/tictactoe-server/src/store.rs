//! Pluggable snapshot persistence.
//!
//! The contract is deliberately coarse: load every record at the start of a
//! registry lifecycle, write every record after a mutation. Records are raw
//! [`serde_json::Value`]s so a single corrupt entry can be skipped by the
//! caller without aborting the whole load.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A key-value snapshot store: record id → JSON snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Read every record. A store that has never been written is empty, not
    /// an error.
    fn load_all(&self) -> Result<HashMap<String, Value>, StoreError>;

    /// Replace the full record set.
    fn save_all(&self, records: &HashMap<String, Value>) -> Result<(), StoreError>;
}

/// Flat-file store: one JSON object per file, written atomically via a temp
/// file and rename. The mutex serializes writers within this process; the
/// cross-request read-modify-write cycle is not transactional (last writer
/// wins), which the design accepts for a casual two-player game.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load_all(&self) -> Result<HashMap<String, Value>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashMap::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save_all(&self, records: &HashMap<String, Value>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store for tests and tooling.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw record, bypassing serialization. Handy for corrupt-record
    /// tests.
    pub fn insert_raw(&self, key: &str, value: Value) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
    }
}

impl SnapshotStore for MemoryStore {
    fn load_all(&self) -> Result<HashMap<String, Value>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save_all(&self, records: &HashMap<String, Value>) -> Result<(), StoreError> {
        *self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = records.clone();
        Ok(())
    }
}
