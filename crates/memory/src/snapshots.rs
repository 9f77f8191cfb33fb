//! The conversation snapshot store.
//!
//! One immutable [`Snapshot`] per node execution, grouped by thread.
//! Snapshots are never deduplicated or mutated; a thread's snapshots go
//! away only through an explicit [`SnapshotStore::clear`]. Like the
//! memory log, every operation is best-effort: storage faults degrade to
//! empty results and a logged warning.

use roundtable_core::error::StorageError;
use roundtable_core::memory::{Snapshot, Storage, ThreadSummary};
use roundtable_core::state::ConversationState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SNAPSHOTS_KEY: &str = "snapshots";

/// The persisted shape: snapshots grouped by thread, append order within
/// each thread.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotDocument {
    threads: BTreeMap<String, Vec<Snapshot>>,
}

/// Per-thread conversation history, persisted through [`Storage`].
pub struct SnapshotStore {
    storage: Arc<dyn Storage>,
    // Serializes the load-append-store cycle in save() and clear().
    write_gate: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            write_gate: Mutex::new(()),
        }
    }

    /// Record one snapshot of the current state for `thread_id`.
    pub async fn save(&self, thread_id: &str, state: &ConversationState) -> bool {
        let _gate = self.write_gate.lock().await;
        let result = async {
            let mut doc = self.load_document().await?;
            doc.threads
                .entry(thread_id.to_string())
                .or_default()
                .push(Snapshot::capture(thread_id, state));
            self.store_document(&doc).await
        }
        .await;
        match result {
            Ok(()) => {
                debug!(thread_id, step = state.current_step, "Snapshot saved");
                true
            }
            Err(e) => {
                warn!(thread_id, error = %e, "Snapshot save failed");
                false
            }
        }
    }

    /// Snapshots for one thread, most recent first.
    pub async fn history(&self, thread_id: &str, limit: usize) -> Vec<Snapshot> {
        let doc = match self.load_document().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(thread_id, error = %e, "Snapshot history read failed");
                return Vec::new();
            }
        };
        let mut snaps = doc.threads.get(thread_id).cloned().unwrap_or_default();
        snaps.reverse();
        snaps.truncate(limit);
        snaps
    }

    /// Recent snapshots across all threads, newest first, at most five
    /// per thread so one busy conversation cannot crowd out the rest.
    pub async fn all_recent(&self, limit: usize) -> Vec<Snapshot> {
        let doc = match self.load_document().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Snapshot scan failed");
                return Vec::new();
            }
        };
        let mut snaps: Vec<Snapshot> = doc
            .threads
            .into_values()
            .flat_map(|thread_snaps| {
                let start = thread_snaps.len().saturating_sub(5);
                thread_snaps.into_iter().skip(start)
            })
            .collect();
        snaps.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        snaps.truncate(limit);
        snaps
    }

    /// Summarize one thread: how many snapshots, the latest one, when it
    /// last changed. A degraded store yields an empty summary with the
    /// fault recorded in `error`.
    pub async fn summary(&self, thread_id: &str) -> ThreadSummary {
        let doc = match self.load_document().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(thread_id, error = %e, "Thread summary read failed");
                return ThreadSummary {
                    thread_id: thread_id.to_string(),
                    conversation_count: 0,
                    latest: None,
                    last_updated: None,
                    error: Some(e.to_string()),
                };
            }
        };
        let snaps = doc.threads.get(thread_id);
        let latest = snaps.and_then(|s| s.last().cloned());
        ThreadSummary {
            thread_id: thread_id.to_string(),
            conversation_count: snaps.map(Vec::len).unwrap_or(0),
            last_updated: latest.as_ref().map(|s| s.timestamp),
            latest,
            error: None,
        }
    }

    /// Remove all snapshots for one thread. Returns `false` on a storage
    /// fault; clearing an unknown thread succeeds.
    pub async fn clear(&self, thread_id: &str) -> bool {
        let _gate = self.write_gate.lock().await;
        let result = async {
            let mut doc = self.load_document().await?;
            doc.threads.remove(thread_id);
            self.store_document(&doc).await
        }
        .await;
        match result {
            Ok(()) => {
                info!(thread_id, "Thread snapshots cleared");
                true
            }
            Err(e) => {
                warn!(thread_id, error = %e, "Snapshot clear failed");
                false
            }
        }
    }

    async fn load_document(&self) -> Result<SnapshotDocument, StorageError> {
        match self.storage.read(SNAPSHOTS_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(SnapshotDocument::default()),
        }
    }

    async fn store_document(&self, doc: &SnapshotDocument) -> Result<(), StorageError> {
        let value =
            serde_json::to_value(doc).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.write(SNAPSHOTS_KEY, value).await
    }
}
