//! File-based storage backend — one JSON document per key.
//!
//! Storage location: `<dir>/<key>.json`. Documents are written whole on
//! every mutation, which keeps reads simple and writes durable. The files
//! are human-inspectable JSON.

use async_trait::async_trait;
use roundtable_core::error::StorageError;
use roundtable_core::memory::Storage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A keyed JSON document store backed by files in one directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create) the storage directory.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StorageError::Io(format!("cannot create {}: {e}", dir.display())))?;
        debug!(dir = %dir.display(), "File storage opened");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal identifiers; keep them filesystem-safe anyway.
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(format!("read {}: {e}", path.display()))),
        };
        let value = serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(format!("parse {}: {e}", path.display())))?;
        Ok(Some(value))
    }

    async fn write(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let content = serde_json::to_string(&value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        std::fs::write(&path, content)
            .map_err(|e| StorageError::Io(format!("write {}: {e}", path.display())))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(format!("remove {}: {e}", path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn write_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = FileStorage::open(dir.path()).unwrap();
            storage.write("doc", json!({"kept": true})).await.unwrap();
        }
        let storage = FileStorage::open(dir.path()).unwrap();
        let value = storage.read("doc").await.unwrap();
        assert_eq!(value, Some(json!({"kept": true})));
    }

    #[tokio::test]
    async fn missing_document_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.read("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupted_document_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("doc.json"), "not json").unwrap();
        assert!(storage.read("doc").await.is_err());
    }

    #[tokio::test]
    async fn remove_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.write("doc", json!(1)).await.unwrap();
        assert!(storage.remove("doc").await.unwrap());
        assert!(!storage.remove("doc").await.unwrap());
        assert_eq!(storage.read("doc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.write("a/../b", json!(1)).await.unwrap();
        // The document lands inside the storage directory.
        assert!(dir.path().join("a____b.json").exists());
    }
}
