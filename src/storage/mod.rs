// src/storage/mod.rs
use crate::utils::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Named keys of the persistent blob store shared with the UI collaborator.
pub mod keys {
    pub const EXTRACTED_DATA: &str = "extractedData";
    pub const EXTRACTION_STATS: &str = "extractionStats";
    pub const CREDENTIALS: &str = "credentials";
    pub const REMOTE_CONFIG: &str = "remoteStoreConfig";
    pub const LAST_EXTRACTION: &str = "lastExtraction";
}

/// Key-value blob store over named JSON values. The store itself belongs to
/// the host environment; this is the narrow surface the pipeline uses.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Reads a typed value from the store, `None` when the key is absent.
pub fn load<T: DeserializeOwned>(
    store: &dyn BlobStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string())),
        None => Ok(None),
    }
}

/// Writes a typed value into the store.
pub fn save<T: Serialize>(
    store: &dyn BlobStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json =
        serde_json::to_value(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(key, json)
}

/// File-backed store: one JSON file per key under a base directory.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Creates the base directory if it doesn't exist.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self { base_dir: base_path })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(&value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(self.key_path(key), raw)?;
        tracing::debug!("Saved blob '{}' to {}", key, self.base_dir.display());
        Ok(())
    }
}

/// In-memory store for tests and short-lived embedders.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}
