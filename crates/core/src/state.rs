//! Conversation state for one in-flight turn.
//!
//! The state is owned exclusively by the turn that is running it. Nodes
//! never mutate it in place: each node computes a [`StatePatch`] and the
//! orchestrator applies it through [`ConversationState::apply`], which
//! makes every field's carry-over behavior explicit. After each node the
//! resulting state is persisted as an immutable snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{Actor, AgentKind, DebateCategory, QueryType, SupervisorDecision};

/// One append-only record of who acted during a turn-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The step counter at the time the actor ran.
    pub step: u32,

    /// Who acted.
    pub actor: Actor,

    /// The supervisor's decision, when the actor is the supervisor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<SupervisorDecision>,

    /// The agent the supervisor selected, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_agent: Option<AgentKind>,

    /// Free-text reasoning attached to the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,

    /// Whether prior history existed before this entry was appended.
    pub is_followup: bool,
}

impl HistoryEntry {
    /// A plain entry for a non-supervisor actor.
    pub fn for_actor(step: u32, actor: Actor, is_followup: bool) -> Self {
        Self {
            step,
            actor,
            decision: None,
            next_agent: None,
            reasoning: None,
            timestamp: Utc::now(),
            is_followup,
        }
    }
}

/// The full mutable state of one conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// The user query driving this turn.
    pub user_query: String,

    /// Classification results.
    pub query_type: Option<QueryType>,
    pub debate_category: Option<DebateCategory>,

    /// Per-specialist analyses. Exactly one is populated per specialist
    /// invocation per step.
    pub domain_expert_analysis: Option<String>,
    pub ux_ui_specialist_analysis: Option<String>,
    pub technical_architect_analysis: Option<String>,
    pub revenue_model_analyst_analysis: Option<String>,

    /// Populated only after at least one specialist analysis exists.
    pub moderator_aggregation: Option<String>,
    pub debate_resolution: Option<String>,
    pub final_answer: Option<String>,

    /// Routing state owned by the supervisor.
    pub active_agent: Option<AgentKind>,
    pub supervisor_decision: Option<SupervisorDecision>,
    pub supervisor_reasoning: Option<String>,

    /// Append-only within a turn-run.
    pub agent_history: Vec<HistoryEntry>,

    /// Strictly increases by exactly 1 per supervisor invocation.
    pub current_step: u32,

    /// The turn budget. The run terminates when `current_step > max_steps`
    /// or `is_complete`, whichever first.
    pub max_steps: u32,

    pub is_complete: bool,

    /// Whether prior turns already existed for this thread at entry.
    pub is_followup: bool,

    /// Wall-clock seconds spent so far.
    pub processing_time: f64,
}

impl ConversationState {
    /// Fresh state for a new turn. The step counter starts at 1.
    pub fn new(user_query: impl Into<String>, max_steps: u32) -> Self {
        Self {
            user_query: user_query.into(),
            query_type: None,
            debate_category: None,
            domain_expert_analysis: None,
            ux_ui_specialist_analysis: None,
            technical_architect_analysis: None,
            revenue_model_analyst_analysis: None,
            moderator_aggregation: None,
            debate_resolution: None,
            final_answer: None,
            active_agent: None,
            supervisor_decision: None,
            supervisor_reasoning: None,
            agent_history: Vec::new(),
            current_step: 1,
            max_steps,
            is_complete: false,
            is_followup: false,
            processing_time: 0.0,
        }
    }

    /// Read the analysis field owned by one specialist.
    pub fn analysis_for(&self, kind: AgentKind) -> Option<&str> {
        match kind {
            AgentKind::DomainExpert => self.domain_expert_analysis.as_deref(),
            AgentKind::UxUiSpecialist => self.ux_ui_specialist_analysis.as_deref(),
            AgentKind::TechnicalArchitect => self.technical_architect_analysis.as_deref(),
            AgentKind::RevenueModelAnalyst => self.revenue_model_analyst_analysis.as_deref(),
            AgentKind::Moderator => self.moderator_aggregation.as_deref(),
        }
    }

    /// Apply a patch, returning the next immutable state.
    ///
    /// This is the single merge point for all node updates. For every
    /// field: `Some` in the patch overwrites, `None` carries the previous
    /// value over. History is append-only; the step counter and completion
    /// flag only move forward.
    pub fn apply(&self, patch: StatePatch) -> ConversationState {
        let mut next = self.clone();

        if let Some(v) = patch.query_type {
            next.query_type = Some(v);
        }
        if let Some(v) = patch.debate_category {
            next.debate_category = Some(v);
        }
        if let Some(v) = patch.domain_expert_analysis {
            next.domain_expert_analysis = Some(v);
        }
        if let Some(v) = patch.ux_ui_specialist_analysis {
            next.ux_ui_specialist_analysis = Some(v);
        }
        if let Some(v) = patch.technical_architect_analysis {
            next.technical_architect_analysis = Some(v);
        }
        if let Some(v) = patch.revenue_model_analyst_analysis {
            next.revenue_model_analyst_analysis = Some(v);
        }
        if let Some(v) = patch.moderator_aggregation {
            next.moderator_aggregation = Some(v);
        }
        if let Some(v) = patch.debate_resolution {
            next.debate_resolution = Some(v);
        }
        if let Some(v) = patch.final_answer {
            next.final_answer = Some(v);
        }
        // The supervisor overwrites the active agent on every decision,
        // including clearing it when the provider named an unknown agent.
        if let Some(v) = patch.active_agent {
            next.active_agent = v;
        }
        if let Some(v) = patch.supervisor_decision {
            next.supervisor_decision = Some(v);
        }
        if let Some(v) = patch.supervisor_reasoning {
            next.supervisor_reasoning = Some(v);
        }

        next.agent_history.extend(patch.append_history);

        if patch.advance_step {
            next.current_step += 1;
        }
        if patch.mark_complete {
            next.is_complete = true;
        }
        if let Some(v) = patch.processing_time {
            next.processing_time = v;
        }

        next
    }
}

/// An explicit update computed by one node.
///
/// `None` means "leave the field as it was". The nested option on
/// `active_agent` distinguishes "keep" (`None`) from "set to no agent"
/// (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub query_type: Option<QueryType>,
    pub debate_category: Option<DebateCategory>,
    pub domain_expert_analysis: Option<String>,
    pub ux_ui_specialist_analysis: Option<String>,
    pub technical_architect_analysis: Option<String>,
    pub revenue_model_analyst_analysis: Option<String>,
    pub moderator_aggregation: Option<String>,
    pub debate_resolution: Option<String>,
    pub final_answer: Option<String>,
    pub active_agent: Option<Option<AgentKind>>,
    pub supervisor_decision: Option<SupervisorDecision>,
    pub supervisor_reasoning: Option<String>,
    pub append_history: Vec<HistoryEntry>,
    pub advance_step: bool,
    pub mark_complete: bool,
    pub processing_time: Option<f64>,
}

/// Per-turn configuration passed explicitly to every node.
///
/// There is no ambient lookup: if a node needs the thread id, the model,
/// or the budget, it reads it from here.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Conversation thread this turn belongs to. Persistence is skipped
    /// when absent.
    pub thread_id: Option<String>,

    /// Model identifier forwarded to the provider.
    pub model: String,

    /// Turn budget.
    pub max_steps: u32,

    /// Raw debate content for the debate-analysis node, when the caller
    /// supplied one.
    pub debate_content: Option<String>,
}
