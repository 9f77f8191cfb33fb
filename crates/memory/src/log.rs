//! The deduplicating, capacity-bounded memory log.
//!
//! One global append-only array of [`MemoryEntry`] records, persisted as
//! a single document. Writes dedup against a window of recent entries and
//! evict the oldest entries past the global cap. Every public operation
//! is best-effort: storage faults are caught here, logged, and degrade to
//! a no-op or empty result — callers never see a fault from this store.

use chrono::{DateTime, Utc};
use roundtable_config::MemoryConfig;
use roundtable_core::error::StorageError;
use roundtable_core::memory::{MemoryEntry, MemoryStats, Storage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::similarity::is_similar_response;

const LOG_KEY: &str = "memory_log";

/// The persisted shape of the whole log.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LogDocument {
    entries: Vec<MemoryEntry>,
    created_at: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
}

enum AppendOutcome {
    Inserted,
    DuplicateSkipped,
}

/// Append-only memory log with duplicate suppression and FIFO eviction.
pub struct MemoryLog {
    storage: Arc<dyn Storage>,
    max_entries: usize,
    dedup_window: usize,
    dedup_threshold: f64,
    // Serializes the dedup-check-then-append read-modify-write.
    write_gate: Mutex<()>,
}

impl MemoryLog {
    pub fn new(storage: Arc<dyn Storage>, config: &MemoryConfig) -> Self {
        Self {
            storage,
            max_entries: config.max_entries,
            dedup_window: config.dedup_window,
            dedup_threshold: config.dedup_threshold,
            write_gate: Mutex::new(()),
        }
    }

    /// Append one entry, suppressing duplicates.
    ///
    /// A duplicate (same thread and query, similar response, within the
    /// dedup window) is silently skipped and still reported as success:
    /// the append is idempotent. Returns `false` only on a storage fault.
    pub async fn append(
        &self,
        thread_id: &str,
        user_query: &str,
        response: &str,
        context: serde_json::Value,
    ) -> bool {
        let _gate = self.write_gate.lock().await;
        match self
            .append_inner(thread_id, user_query, response, context)
            .await
        {
            Ok(AppendOutcome::Inserted) => {
                debug!(thread_id, "Memory entry appended");
                true
            }
            Ok(AppendOutcome::DuplicateSkipped) => {
                info!(thread_id, "Duplicate memory entry skipped");
                true
            }
            Err(e) => {
                warn!(thread_id, error = %e, "Memory append failed");
                false
            }
        }
    }

    async fn append_inner(
        &self,
        thread_id: &str,
        user_query: &str,
        response: &str,
        context: serde_json::Value,
    ) -> Result<AppendOutcome, StorageError> {
        let mut doc = self.load_document().await?;

        let window_start = doc.entries.len().saturating_sub(self.dedup_window);
        let duplicate = doc.entries[window_start..].iter().any(|existing| {
            existing.thread_id == thread_id
                && existing.user_query == user_query
                && is_similar_response(&existing.response, response, self.dedup_threshold)
        });
        if duplicate {
            return Ok(AppendOutcome::DuplicateSkipped);
        }

        doc.entries
            .push(MemoryEntry::new(thread_id, user_query, response, context));

        if doc.entries.len() > self.max_entries {
            let excess = doc.entries.len() - self.max_entries;
            doc.entries.drain(..excess);
        }

        let now = Utc::now();
        doc.created_at.get_or_insert(now);
        doc.last_updated = Some(now);

        self.store_document(&doc).await?;
        Ok(AppendOutcome::Inserted)
    }

    /// Recent entries, most-recent-last, optionally filtered by thread.
    pub async fn context(&self, thread_id: Option<&str>, limit: usize) -> Vec<MemoryEntry> {
        let doc = match self.load_document().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Memory context read failed");
                return Vec::new();
            }
        };

        let mut entries: Vec<MemoryEntry> = match thread_id {
            Some(tid) => doc
                .entries
                .into_iter()
                .filter(|e| e.thread_id == tid)
                .collect(),
            None => doc.entries,
        };
        let start = entries.len().saturating_sub(limit);
        entries.drain(..start);
        entries
    }

    /// Entries whose query or response contains `text`, case-insensitive,
    /// most-recent-last.
    pub async fn search(&self, text: &str, limit: usize) -> Vec<MemoryEntry> {
        let doc = match self.load_document().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Memory search failed");
                return Vec::new();
            }
        };

        let needle = text.to_lowercase();
        let mut matches: Vec<MemoryEntry> = doc
            .entries
            .into_iter()
            .filter(|e| {
                e.user_query.to_lowercase().contains(&needle)
                    || e.response.to_lowercase().contains(&needle)
            })
            .collect();
        let start = matches.len().saturating_sub(limit);
        matches.drain(..start);
        matches
    }

    /// Remove entries for one thread, or everything when `thread_id` is
    /// omitted.
    pub async fn clear(&self, thread_id: Option<&str>) -> bool {
        let _gate = self.write_gate.lock().await;
        let result = match thread_id {
            None => self.storage.remove(LOG_KEY).await.map(|_| ()),
            Some(tid) => match self.load_document().await {
                Ok(mut doc) => {
                    doc.entries.retain(|e| e.thread_id != tid);
                    doc.last_updated = Some(Utc::now());
                    self.store_document(&doc).await
                }
                Err(e) => Err(e),
            },
        };
        match result {
            Ok(()) => {
                info!(thread_id = thread_id.unwrap_or("<all>"), "Memory cleared");
                true
            }
            Err(e) => {
                warn!(error = %e, "Memory clear failed");
                false
            }
        }
    }

    /// Statistics about the log and its backend.
    pub async fn stats(&self) -> MemoryStats {
        let backend = self.storage.name().to_string();
        match self.load_document().await {
            Ok(doc) => {
                let threads: HashSet<&str> =
                    doc.entries.iter().map(|e| e.thread_id.as_str()).collect();
                MemoryStats {
                    total_entries: doc.entries.len(),
                    thread_count: threads.len(),
                    backend,
                    created_at: doc.created_at,
                    last_updated: doc.last_updated,
                }
            }
            Err(e) => {
                warn!(error = %e, "Memory stats read failed");
                MemoryStats {
                    total_entries: 0,
                    thread_count: 0,
                    backend,
                    created_at: None,
                    last_updated: None,
                }
            }
        }
    }

    async fn load_document(&self) -> Result<LogDocument, StorageError> {
        match self.storage.read(LOG_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(LogDocument::default()),
        }
    }

    async fn store_document(&self, doc: &LogDocument) -> Result<(), StorageError> {
        let value =
            serde_json::to_value(doc).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.write(LOG_KEY, value).await
    }
}
