//! Storage trait and persisted record types.
//!
//! The Memory Log and the Conversation Snapshot Store both persist
//! through the [`Storage`] trait — a keyed JSON document store. The
//! implementation (file-backed or in-memory) is selected at construction
//! time by a factory and injected; there is no ambient global store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentKind, QueryType, SupervisorDecision};
use crate::error::StorageError;
use crate::state::{ConversationState, HistoryEntry};

/// One immutable entry in the deduplicating memory log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Derived from the thread id and the write time.
    pub entry_id: String,

    /// The thread this entry belongs to.
    pub thread_id: String,

    /// The user query that produced the response.
    pub user_query: String,

    /// The finalized response text.
    pub response: String,

    /// Arbitrary context recorded alongside the response (agent history,
    /// timings, analyses).
    #[serde(default)]
    pub context: serde_json::Value,

    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(
        thread_id: impl Into<String>,
        user_query: impl Into<String>,
        response: impl Into<String>,
        context: serde_json::Value,
    ) -> Self {
        let thread_id = thread_id.into();
        let timestamp = Utc::now();
        Self {
            entry_id: format!("{}_{}", thread_id, timestamp.timestamp_millis()),
            thread_id,
            user_query: user_query.into(),
            response: response.into(),
            context,
            timestamp,
        }
    }
}

/// Statistics about the memory log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_entries: usize,
    pub thread_count: usize,
    /// Which storage backend is in use.
    pub backend: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// The per-specialist analyses captured in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub domain_expert: Option<String>,
    pub ux_ui_specialist: Option<String>,
    pub technical_architect: Option<String>,
    pub revenue_model_analyst: Option<String>,
    pub moderator_aggregation: Option<String>,
    pub debate_resolution: Option<String>,
}

/// One immutable per-node record of conversation state, used for
/// history and audit. Never deduplicated, never mutated; deleted only by
/// an explicit thread clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub thread_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_query: String,
    pub query_type: Option<QueryType>,
    pub current_step: u32,
    pub agent_history: Vec<HistoryEntry>,
    pub active_agent: Option<AgentKind>,
    pub supervisor_decision: Option<SupervisorDecision>,
    pub supervisor_reasoning: Option<String>,
    pub is_complete: bool,
    pub processing_time: f64,
    pub final_answer: Option<String>,
    pub analyses: AnalysisSnapshot,
}

impl Snapshot {
    /// Capture the current conversation state for one thread.
    pub fn capture(thread_id: impl Into<String>, state: &ConversationState) -> Self {
        Self {
            thread_id: thread_id.into(),
            timestamp: Utc::now(),
            user_query: state.user_query.clone(),
            query_type: state.query_type,
            current_step: state.current_step,
            agent_history: state.agent_history.clone(),
            active_agent: state.active_agent,
            supervisor_decision: state.supervisor_decision,
            supervisor_reasoning: state.supervisor_reasoning.clone(),
            is_complete: state.is_complete,
            processing_time: state.processing_time,
            final_answer: state.final_answer.clone(),
            analyses: AnalysisSnapshot {
                domain_expert: state.domain_expert_analysis.clone(),
                ux_ui_specialist: state.ux_ui_specialist_analysis.clone(),
                technical_architect: state.technical_architect_analysis.clone(),
                revenue_model_analyst: state.revenue_model_analyst_analysis.clone(),
                moderator_aggregation: state.moderator_aggregation.clone(),
                debate_resolution: state.debate_resolution.clone(),
            },
        }
    }
}

/// Summary of one conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub conversation_count: usize,
    pub latest: Option<Snapshot>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Diagnostic when the summary was assembled from a degraded store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The core Storage trait — a keyed JSON document store.
///
/// Implementations: file-backed (persistent), in-memory (fallback and
/// tests). Single-document reads and writes are atomic; callers that need
/// read-modify-write atomicity serialize it themselves.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Read the document stored under `key`, if any.
    async fn read(&self, key: &str)
        -> std::result::Result<Option<serde_json::Value>, StorageError>;

    /// Write the document under `key`, replacing any previous value.
    async fn write(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> std::result::Result<(), StorageError>;

    /// Remove the document under `key`. Returns whether it existed.
    async fn remove(&self, key: &str) -> std::result::Result<bool, StorageError>;
}
