//! The supervisor decision engine.
//!
//! Assembles the context bundle (recent snapshots plus recent memory
//! entries), delegates the routing decision to the provider, and turns
//! the verdict into a state patch. A provider fault here aborts the
//! turn: guessing a route would trigger paid specialist calls.

use chrono::Utc;
use roundtable_core::agents::{Actor, AgentKind};
use roundtable_core::error::Error;
use roundtable_core::provider::AnalysisProvider;
use roundtable_core::state::{ConversationState, HistoryEntry, StatePatch, TurnConfig};
use roundtable_memory::{MemoryLog, SnapshotStore};
use std::sync::Arc;
use tracing::{debug, info};

const SNAPSHOT_CONTEXT_LIMIT: usize = 5;
const MEMORY_CONTEXT_LIMIT: usize = 10;
const MEMORY_RENDER_LIMIT: usize = 5;
const RESPONSE_RENDER_CHARS: usize = 150;

/// Truncate to at most `max` characters, never splitting a code point.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The routing brain: one decision per step.
pub struct Supervisor {
    provider: Arc<dyn AnalysisProvider>,
    snapshots: Arc<SnapshotStore>,
    memory: Arc<MemoryLog>,
}

impl Supervisor {
    pub fn new(
        provider: Arc<dyn AnalysisProvider>,
        snapshots: Arc<SnapshotStore>,
        memory: Arc<MemoryLog>,
    ) -> Self {
        Self {
            provider,
            snapshots,
            memory,
        }
    }

    /// The textual side input to the decision call: the thread's recent
    /// snapshots (most recent first) and recent memory entries. Reads are
    /// best-effort; a degraded store yields an empty section.
    pub async fn context_bundle(&self, thread_id: &str, state: &ConversationState) -> String {
        let mut bundle = String::new();

        bundle.push_str(&format!(
            "Current query: {}\nStep {} of {}\n",
            state.user_query, state.current_step, state.max_steps
        ));

        let analyzed: Vec<&str> = AgentKind::ALL
            .iter()
            .filter(|kind| state.analysis_for(**kind).is_some())
            .map(|kind| kind.as_str())
            .collect();
        if analyzed.is_empty() {
            bundle.push_str("Completed analyses: none\n");
        } else {
            bundle.push_str(&format!("Completed analyses: {}\n", analyzed.join(", ")));
        }

        let history = self.snapshots.history(thread_id, SNAPSHOT_CONTEXT_LIMIT).await;
        if !history.is_empty() {
            bundle.push_str("\nRecent conversation turns (newest first):\n");
            for snap in &history {
                bundle.push_str(&format!(
                    "- step {}: {} (complete: {})\n",
                    snap.current_step, snap.user_query, snap.is_complete
                ));
            }
        }

        let entries = self.memory.context(Some(thread_id), MEMORY_CONTEXT_LIMIT).await;
        let render_from = entries.len().saturating_sub(MEMORY_RENDER_LIMIT);
        if !entries.is_empty() {
            bundle.push_str("\nRemembered exchanges:\n");
            for entry in &entries[render_from..] {
                bundle.push_str(&format!(
                    "- Q: {} / A: {}\n",
                    entry.user_query,
                    truncate_chars(&entry.response, RESPONSE_RENDER_CHARS)
                ));
            }
        }

        bundle
    }

    /// Run one supervisor decision and return its state patch.
    ///
    /// The patch records the verdict, selects the active agent, appends
    /// the supervisor history entry, and advances the step counter by
    /// exactly one. Provider faults propagate.
    pub async fn decide(
        &self,
        state: &ConversationState,
        config: &TurnConfig,
    ) -> Result<StatePatch, Error> {
        let thread_id = config.thread_id.as_deref().unwrap_or("");
        let bundle = self.context_bundle(thread_id, state).await;
        debug!(step = state.current_step, "Requesting supervisor decision");

        let verdict = self.provider.decide_next(&bundle).await?;
        info!(
            decision = %verdict.decision,
            next_agent = verdict.next_agent.map(|a| a.as_str()).unwrap_or("none"),
            step = state.current_step,
            "Supervisor decided"
        );

        let is_followup = !state.agent_history.is_empty() || state.is_followup;
        let entry = HistoryEntry {
            step: state.current_step,
            actor: Actor::Supervisor,
            decision: Some(verdict.decision),
            next_agent: verdict.next_agent,
            reasoning: Some(verdict.reasoning.clone()),
            timestamp: Utc::now(),
            is_followup,
        };

        Ok(StatePatch {
            supervisor_decision: Some(verdict.decision),
            supervisor_reasoning: Some(verdict.reasoning),
            // An unknown or missing agent clears the field; the router
            // then falls back to the supervisor rather than erroring.
            active_agent: Some(verdict.next_agent),
            append_history: vec![entry],
            advance_step: true,
            ..Default::default()
        })
    }
}
