//! In-memory storage backend — the fallback store and the test store.

use async_trait::async_trait;
use roundtable_core::error::StorageError;
use roundtable_core::memory::Storage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A keyed JSON document store held entirely in process memory.
///
/// Used when persistence isn't configured or the file backend cannot be
/// opened. Cloning shares the underlying map.
#[derive(Clone)]
pub struct InMemoryStorage {
    docs: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.docs.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        self.docs.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.docs.write().await.remove(key).is_some())
    }
}
