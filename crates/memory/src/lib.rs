//! Persistence layer for Roundtable.
//!
//! Two stores share one [`Storage`] backend:
//! - [`MemoryLog`] — the deduplicating, capacity-bounded append log used
//!   as LLM context for future turns.
//! - [`SnapshotStore`] — one immutable record per node execution, used
//!   for history and audit.
//!
//! Backends are selected by [`create_storage`] and injected; the file
//! backend falls back to in-memory when it cannot be opened, with
//! identical external behavior.

pub mod file_store;
pub mod in_memory;
pub mod log;
pub mod similarity;
pub mod snapshots;

use std::sync::Arc;

use roundtable_config::MemoryConfig;
use roundtable_core::Storage;
use tracing::{info, warn};

pub use file_store::FileStorage;
pub use in_memory::InMemoryStorage;
pub use log::MemoryLog;
pub use similarity::{is_similar_response, jaccard_similarity};
pub use snapshots::SnapshotStore;

/// Select and open the storage backend named by the configuration.
///
/// An unopenable file backend degrades to in-memory storage rather than
/// failing: context persistence is best-effort, not correctness-critical.
pub fn create_storage(config: &MemoryConfig) -> Arc<dyn Storage> {
    match config.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            Arc::new(InMemoryStorage::new())
        }
        _ => match FileStorage::open(&config.dir) {
            Ok(storage) => {
                info!(dir = %config.dir.display(), "Using file storage backend");
                Arc::new(storage)
            }
            Err(e) => {
                warn!(error = %e, "File storage unavailable, falling back to in-memory");
                Arc::new(InMemoryStorage::new())
            }
        },
    }
}
