//! Pluggable snapshot storage.
//!
//! Stores serialize their snapshots to strings and hand them to a
//! [`StorageProvider`] keyed by store name. The file backend writes one
//! JSON file per store under a directory; the memory backend exists for
//! tests and for running without a storage directory configured.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

/// Failure in a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A keyed string store for persisted snapshots.
pub trait StorageProvider: Send + Sync {
    /// The stored value for `name`, or `None` when nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    fn get(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `name`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be written.
    fn set(&self, name: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be written.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// In-memory storage. Snapshots do not survive the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for MemoryStorage {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(name);
        Ok(())
    }
}

/// One JSON file per store under a directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create the backend, making the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl StorageProvider for FileStorage {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(name)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StorageError> {
        // Write to a sibling then rename, so a crash mid-write cannot
        // leave a truncated snapshot.
        let path = self.path_for(name);
        let tmp = self.dir.join(format!("{name}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.get("product-store").unwrap().is_none());

        storage.set("product-store", "{}").unwrap();
        assert_eq!(storage.get("product-store").unwrap().as_deref(), Some("{}"));

        storage.remove("product-store").unwrap();
        assert!(storage.get("product-store").unwrap().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("fairmarket-persist-{}", std::process::id()));
        let storage = FileStorage::new(&dir).unwrap();

        assert!(storage.get("auth-store").unwrap().is_none());
        storage.set("auth-store", r#"{"a":1}"#).unwrap();
        assert_eq!(
            storage.get("auth-store").unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
        storage.remove("auth-store").unwrap();
        assert!(storage.get("auth-store").unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
