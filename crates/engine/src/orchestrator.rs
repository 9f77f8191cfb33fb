//! The turn orchestrator.
//!
//! Runs one conversation turn as a sequential chain of awaited steps:
//! classify, maybe shortcut past the supervisor, then loop supervisor ⇄
//! specialists until the decision or the step budget ends the turn, and
//! finalize. Routing between nodes is a pure function over the state, so
//! the transition priority is unit-testable without a provider.

use chrono::Utc;
use roundtable_config::EngineConfig;
use roundtable_core::agents::{
    Actor, AgentKind, AnalysisKind, DebateCategory, QueryType, RouteTarget, SupervisorDecision,
};
use roundtable_core::error::Error;
use roundtable_core::memory::{AnalysisSnapshot, MemoryEntry, Snapshot, Storage, ThreadSummary};
use roundtable_core::provider::AnalysisProvider;
use roundtable_core::state::{ConversationState, HistoryEntry, StatePatch, TurnConfig};
use roundtable_memory::{create_storage, MemoryLog, SnapshotStore};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classifier::{classify_query, route_followup};
use crate::supervisor::Supervisor;

const CONTEXT_HISTORY_LIMIT: usize = 10;
const CONTEXT_MEMORY_LIMIT: usize = 10;
const NO_ANALYSIS_PLACEHOLDER: &str = "(not yet analyzed)";

/// Where the turn goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Node {
    Supervisor,
    Specialist(AgentKind),
    Debate,
    Finalize,
}

/// The transition rules at the supervisor boundary, in priority order:
/// completion, then budget, then the decision. An unknown or missing
/// agent under a Continue decision falls back to the supervisor rather
/// than dead-ending.
pub(crate) fn route_decision(state: &ConversationState) -> Node {
    if state.is_complete {
        return Node::Finalize;
    }
    if state.current_step > state.max_steps {
        return Node::Finalize;
    }
    match state.supervisor_decision {
        None => Node::Supervisor,
        Some(SupervisorDecision::End) => Node::Finalize,
        Some(SupervisorDecision::Debate) => Node::Debate,
        Some(SupervisorDecision::Continue) => match state.active_agent {
            Some(kind) => Node::Specialist(kind),
            None => Node::Supervisor,
        },
    }
}

/// The analysis produced by the specialist that acted most recently,
/// walking the history backwards. Falls back to whichever analysis field
/// is populated when the history names none.
pub(crate) fn latest_specialist_analysis(state: &ConversationState) -> Option<String> {
    for entry in state.agent_history.iter().rev() {
        if let Some(kind) = entry.actor.as_agent_kind() {
            if let Some(text) = state.analysis_for(kind) {
                return Some(text.to_string());
            }
        }
    }
    state
        .moderator_aggregation
        .clone()
        .or_else(|| state.revenue_model_analyst_analysis.clone())
        .or_else(|| state.technical_architect_analysis.clone())
        .or_else(|| state.ux_ui_specialist_analysis.clone())
        .or_else(|| state.domain_expert_analysis.clone())
}

/// One turn request from the caller.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub query: String,
    pub thread_id: Option<String>,
    pub max_steps: u32,
    pub debate_content: Option<String>,
}

impl TurnRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            thread_id: None,
            max_steps: 10,
            debate_content: None,
        }
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_debate_content(mut self, content: impl Into<String>) -> Self {
        self.debate_content = Some(content.into());
        self
    }
}

/// What one completed turn returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub thread_id: String,
    pub final_answer: String,
    pub processing_time_seconds: f64,
    pub query_type: Option<QueryType>,
    pub debate_category: Option<DebateCategory>,
    pub analyses: AnalysisSnapshot,
    pub agent_history: Vec<HistoryEntry>,
    pub supervisor_reasoning: Option<String>,
    pub is_followup: bool,
}

/// The best-effort context read for one thread. Never fails; a degraded
/// store surfaces as empty collections plus a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct ContextView {
    pub thread_id: String,
    pub history: Vec<Snapshot>,
    pub memory_context: Vec<MemoryEntry>,
    pub thread_summary: ThreadSummary,
    pub has_context: bool,
    pub conversation_count: usize,
    pub error: Option<String>,
}

/// The engine: ties the classifier, the supervisor, the specialists, and
/// the two stores into the run-turn and get-context operations.
pub struct TurnEngine {
    provider: Arc<dyn AnalysisProvider>,
    supervisor: Supervisor,
    memory: Arc<MemoryLog>,
    snapshots: Arc<SnapshotStore>,
    config: EngineConfig,
}

impl TurnEngine {
    /// Build an engine over the storage backend named by the config.
    pub fn new(provider: Arc<dyn AnalysisProvider>, config: EngineConfig) -> Self {
        let storage = create_storage(&config.memory);
        Self::with_storage(provider, config, storage)
    }

    /// Build an engine over an explicit storage backend.
    pub fn with_storage(
        provider: Arc<dyn AnalysisProvider>,
        config: EngineConfig,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let memory = Arc::new(MemoryLog::new(storage.clone(), &config.memory));
        let snapshots = Arc::new(SnapshotStore::new(storage));
        let supervisor = Supervisor::new(provider.clone(), snapshots.clone(), memory.clone());
        Self {
            provider,
            supervisor,
            memory,
            snapshots,
            config,
        }
    }

    pub fn memory(&self) -> &Arc<MemoryLog> {
        &self.memory
    }

    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    /// Run one conversation turn end to end.
    ///
    /// Provider faults abort the turn with an error; persistence faults
    /// degrade to missing context and the turn continues.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome, Error> {
        let started = Instant::now();
        let thread_id = request
            .thread_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let turn_config = TurnConfig {
            thread_id: Some(thread_id.clone()),
            model: self.config.model.clone(),
            max_steps: request.max_steps,
            debate_content: request.debate_content.clone(),
        };

        let has_history = self.snapshots.summary(&thread_id).await.conversation_count > 0;

        let mut state = ConversationState::new(&request.query, request.max_steps);
        state.is_followup = has_history;

        let (query_type, debate_category) = classify_query(&request.query);
        state = state.apply(StatePatch {
            query_type: Some(query_type),
            debate_category,
            ..Default::default()
        });

        info!(
            thread_id = %thread_id,
            query_type = ?query_type,
            is_followup = has_history,
            "Turn started"
        );

        let mut node = match route_followup(&request.query, has_history) {
            RouteTarget::Supervisor => Node::Supervisor,
            RouteTarget::Specialist(kind) => {
                info!(thread_id = %thread_id, specialist = kind.as_str(), "Follow-up shortcut");
                Node::Specialist(kind)
            }
        };

        loop {
            match node {
                Node::Supervisor => {
                    if state.is_complete || state.current_step > state.max_steps {
                        node = Node::Finalize;
                        continue;
                    }
                    let patch = self.supervisor.decide(&state, &turn_config).await?;
                    state = state.apply(patch);
                    self.snapshots.save(&thread_id, &state).await;
                    node = route_decision(&state);
                }
                Node::Specialist(kind) => {
                    let patch = self.run_specialist(kind, &state).await?;
                    state = state.apply(patch);
                    self.snapshots.save(&thread_id, &state).await;
                    node = Node::Supervisor;
                }
                Node::Debate => {
                    let patch = self.run_debate(&state, &turn_config).await?;
                    state = state.apply(patch);
                    self.snapshots.save(&thread_id, &state).await;
                    node = Node::Supervisor;
                }
                Node::Finalize => {
                    state = self.finalize(&thread_id, state, started).await?;
                    break;
                }
            }
        }

        info!(
            thread_id = %thread_id,
            steps = state.current_step,
            seconds = state.processing_time,
            "Turn finished"
        );

        Ok(TurnOutcome {
            thread_id,
            final_answer: state.final_answer.clone().unwrap_or_default(),
            processing_time_seconds: state.processing_time,
            query_type: state.query_type,
            debate_category: state.debate_category,
            analyses: AnalysisSnapshot {
                domain_expert: state.domain_expert_analysis.clone(),
                ux_ui_specialist: state.ux_ui_specialist_analysis.clone(),
                technical_architect: state.technical_architect_analysis.clone(),
                revenue_model_analyst: state.revenue_model_analyst_analysis.clone(),
                moderator_aggregation: state.moderator_aggregation.clone(),
                debate_resolution: state.debate_resolution.clone(),
            },
            agent_history: state.agent_history,
            supervisor_reasoning: state.supervisor_reasoning,
            is_followup: state.is_followup,
        })
    }

    /// The best-effort context read exposed to the caller.
    pub async fn get_context(&self, thread_id: &str) -> ContextView {
        let history = self.snapshots.history(thread_id, CONTEXT_HISTORY_LIMIT).await;
        let memory_context = self.memory.context(Some(thread_id), CONTEXT_MEMORY_LIMIT).await;
        let thread_summary = self.snapshots.summary(thread_id).await;
        let has_context = !history.is_empty() || !memory_context.is_empty();
        ContextView {
            thread_id: thread_id.to_string(),
            conversation_count: thread_summary.conversation_count,
            error: thread_summary.error.clone(),
            history,
            memory_context,
            thread_summary,
            has_context,
        }
    }

    async fn run_specialist(
        &self,
        kind: AgentKind,
        state: &ConversationState,
    ) -> Result<StatePatch, Error> {
        let prompt = specialist_prompt(kind, state);
        debug!(specialist = kind.as_str(), step = state.current_step, "Running specialist");
        let text = self.provider.analyze(AnalysisKind::from(kind), &prompt).await?;

        let mut patch = StatePatch::default();
        match kind {
            AgentKind::DomainExpert => patch.domain_expert_analysis = Some(text),
            AgentKind::UxUiSpecialist => patch.ux_ui_specialist_analysis = Some(text),
            AgentKind::TechnicalArchitect => patch.technical_architect_analysis = Some(text),
            AgentKind::RevenueModelAnalyst => patch.revenue_model_analyst_analysis = Some(text),
            AgentKind::Moderator => patch.moderator_aggregation = Some(text),
        }
        patch.append_history = vec![HistoryEntry::for_actor(
            state.current_step,
            Actor::from(kind),
            !state.agent_history.is_empty() || state.is_followup,
        )];
        Ok(patch)
    }

    async fn run_debate(
        &self,
        state: &ConversationState,
        config: &TurnConfig,
    ) -> Result<StatePatch, Error> {
        let content = config.debate_content.as_deref().unwrap_or(&state.user_query);
        let prompt = format!("Resolve the following debate:\n{content}");
        debug!(step = state.current_step, "Running debate analysis");
        let text = self.provider.analyze(AnalysisKind::Debate, &prompt).await?;

        let mut patch = StatePatch {
            debate_resolution: Some(text),
            ..Default::default()
        };
        if state.debate_category.is_none() {
            patch.debate_category = Some(DebateCategory::Moderator);
        }
        patch.append_history = vec![HistoryEntry::for_actor(
            state.current_step,
            Actor::DebateAnalyzer,
            !state.agent_history.is_empty() || state.is_followup,
        )];
        Ok(patch)
    }

    /// The single terminal state.
    ///
    /// Follow-up turns reuse the latest specialist analysis verbatim and
    /// skip the compose round-trip; new-query turns always compose. Both
    /// branches write exactly one memory entry tagged with the full agent
    /// history and timing.
    async fn finalize(
        &self,
        thread_id: &str,
        state: ConversationState,
        started: Instant,
    ) -> Result<ConversationState, Error> {
        let final_answer = if state.is_followup {
            match latest_specialist_analysis(&state) {
                Some(text) => {
                    debug!(thread_id, "Finalize fast path: reusing specialist analysis");
                    text
                }
                None => self.compose(&state).await?,
            }
        } else {
            self.compose(&state).await?
        };

        let elapsed = started.elapsed().as_secs_f64();
        let entry = HistoryEntry {
            step: state.current_step,
            actor: Actor::Finalizer,
            decision: None,
            next_agent: None,
            reasoning: None,
            timestamp: Utc::now(),
            is_followup: !state.agent_history.is_empty() || state.is_followup,
        };
        let state = state.apply(StatePatch {
            final_answer: Some(final_answer.clone()),
            append_history: vec![entry],
            mark_complete: true,
            processing_time: Some(elapsed),
            ..Default::default()
        });

        let context = json!({
            "agent_history": &state.agent_history,
            "processing_time": elapsed,
            "query_type": state.query_type,
        });
        self.memory
            .append(thread_id, &state.user_query, &final_answer, context)
            .await;
        self.snapshots.save(thread_id, &state).await;
        Ok(state)
    }

    async fn compose(&self, state: &ConversationState) -> Result<String, Error> {
        let prompt = match &state.moderator_aggregation {
            Some(aggregation) => format!(
                "User query: {}\n\nModerator aggregation:\n{}",
                state.user_query, aggregation
            ),
            None => format!(
                "User query: {}\n\nDomain expert:\n{}\n\nUX/UI specialist:\n{}\n\n\
                 Technical architect:\n{}\n\nRevenue model analyst:\n{}",
                state.user_query,
                analysis_or_placeholder(state, AgentKind::DomainExpert),
                analysis_or_placeholder(state, AgentKind::UxUiSpecialist),
                analysis_or_placeholder(state, AgentKind::TechnicalArchitect),
                analysis_or_placeholder(state, AgentKind::RevenueModelAnalyst),
            ),
        };
        Ok(self.provider.compose_final(&prompt).await?)
    }
}

fn analysis_or_placeholder(state: &ConversationState, kind: AgentKind) -> &str {
    state.analysis_for(kind).unwrap_or(NO_ANALYSIS_PLACEHOLDER)
}

fn specialist_prompt(kind: AgentKind, state: &ConversationState) -> String {
    match kind {
        // The moderator aggregates whatever the specialists produced so
        // far, with placeholders for the missing ones.
        AgentKind::Moderator => format!(
            "User query: {}\n\nDomain expert:\n{}\n\nUX/UI specialist:\n{}\n\n\
             Technical architect:\n{}\n\nRevenue model analyst:\n{}",
            state.user_query,
            analysis_or_placeholder(state, AgentKind::DomainExpert),
            analysis_or_placeholder(state, AgentKind::UxUiSpecialist),
            analysis_or_placeholder(state, AgentKind::TechnicalArchitect),
            analysis_or_placeholder(state, AgentKind::RevenueModelAnalyst),
        ),
        _ => format!(
            "User query: {}\nQuery type: {}",
            state.user_query,
            state
                .query_type
                .map(|t| format!("{t:?}"))
                .unwrap_or_else(|| "unknown".into()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{analysis_text, ScriptedProvider};
    use roundtable_config::MemoryConfig;
    use roundtable_core::provider::SupervisorVerdict;
    use roundtable_memory::InMemoryStorage;
    use std::sync::atomic::Ordering;

    fn memory_config() -> EngineConfig {
        EngineConfig {
            memory: MemoryConfig {
                backend: "memory".into(),
                ..MemoryConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn engine_with(provider: Arc<ScriptedProvider>) -> TurnEngine {
        TurnEngine::with_storage(provider, memory_config(), Arc::new(InMemoryStorage::new()))
    }

    fn continue_to(kind: AgentKind) -> SupervisorVerdict {
        SupervisorVerdict {
            decision: SupervisorDecision::Continue,
            next_agent: Some(kind),
            reasoning: format!("dispatch {}", kind.as_str()),
        }
    }

    fn end_verdict() -> SupervisorVerdict {
        SupervisorVerdict {
            decision: SupervisorDecision::End,
            next_agent: None,
            reasoning: "enough analysis".into(),
        }
    }

    mod routing {
        use super::*;

        #[test]
        fn completion_wins_over_everything() {
            let mut state = ConversationState::new("q", 10);
            state.is_complete = true;
            state.supervisor_decision = Some(SupervisorDecision::Continue);
            state.active_agent = Some(AgentKind::DomainExpert);
            assert_eq!(route_decision(&state), Node::Finalize);
        }

        #[test]
        fn exhausted_budget_finalizes() {
            let mut state = ConversationState::new("q", 2);
            state.current_step = 3;
            state.supervisor_decision = Some(SupervisorDecision::Continue);
            state.active_agent = Some(AgentKind::DomainExpert);
            assert_eq!(route_decision(&state), Node::Finalize);
        }

        #[test]
        fn no_decision_yet_goes_to_supervisor() {
            let state = ConversationState::new("q", 10);
            assert_eq!(route_decision(&state), Node::Supervisor);
        }

        #[test]
        fn end_decision_finalizes() {
            let mut state = ConversationState::new("q", 10);
            state.supervisor_decision = Some(SupervisorDecision::End);
            assert_eq!(route_decision(&state), Node::Finalize);
        }

        #[test]
        fn debate_decision_routes_to_debate() {
            let mut state = ConversationState::new("q", 10);
            state.supervisor_decision = Some(SupervisorDecision::Debate);
            assert_eq!(route_decision(&state), Node::Debate);
        }

        #[test]
        fn continue_dispatches_the_active_agent() {
            let mut state = ConversationState::new("q", 10);
            state.supervisor_decision = Some(SupervisorDecision::Continue);
            state.active_agent = Some(AgentKind::TechnicalArchitect);
            assert_eq!(
                route_decision(&state),
                Node::Specialist(AgentKind::TechnicalArchitect)
            );
        }

        #[test]
        fn continue_without_agent_falls_back_to_supervisor() {
            let mut state = ConversationState::new("q", 10);
            state.supervisor_decision = Some(SupervisorDecision::Continue);
            state.active_agent = None;
            assert_eq!(route_decision(&state), Node::Supervisor);
        }
    }

    #[test]
    fn latest_analysis_follows_history_order() {
        let mut state = ConversationState::new("q", 10);
        state.technical_architect_analysis = Some("tech answer".into());
        state.agent_history = vec![
            HistoryEntry::for_actor(1, Actor::Supervisor, true),
            HistoryEntry::for_actor(1, Actor::TechnicalArchitect, true),
        ];
        assert_eq!(
            latest_specialist_analysis(&state).as_deref(),
            Some("tech answer")
        );
    }

    #[tokio::test]
    async fn always_continue_supervisor_terminates_within_budget() {
        let provider = Arc::new(
            ScriptedProvider::new().with_fallback(continue_to(AgentKind::DomainExpert)),
        );
        let engine = engine_with(provider.clone());

        let outcome = engine
            .run_turn(TurnRequest::new("Build an app").with_max_steps(3))
            .await
            .unwrap();

        assert_eq!(provider.decide_calls.load(Ordering::SeqCst), 3);
        assert!(!outcome.final_answer.is_empty());
        assert!(!outcome.is_followup);
    }

    #[tokio::test]
    async fn budget_of_one_still_produces_an_answer() {
        let provider = Arc::new(
            ScriptedProvider::new().with_fallback(continue_to(AgentKind::DomainExpert)),
        );
        let engine = engine_with(provider.clone());

        let outcome = engine
            .run_turn(TurnRequest::new("Build an app").with_max_steps(1))
            .await
            .unwrap();

        assert_eq!(provider.decide_calls.load(Ordering::SeqCst), 1);
        assert!(!outcome.final_answer.is_empty());
    }

    #[tokio::test]
    async fn followup_reuses_analysis_without_composing() {
        let provider = Arc::new(ScriptedProvider::new().with_verdicts(vec![end_verdict()]));
        let engine = engine_with(provider.clone());

        // Seed prior history so the next turn is a follow-up.
        engine
            .snapshots()
            .save("t1", &ConversationState::new("earlier", 10))
            .await;

        let outcome = engine
            .run_turn(
                TurnRequest::new("What about the database architecture?").with_thread_id("t1"),
            )
            .await
            .unwrap();

        assert!(outcome.is_followup);
        assert_eq!(
            outcome.final_answer,
            analysis_text(AnalysisKind::TechnicalArchitect)
        );
        assert_eq!(provider.compose_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn new_query_always_composes() {
        let provider = Arc::new(ScriptedProvider::new().with_verdicts(vec![
            continue_to(AgentKind::Moderator),
            end_verdict(),
        ]));
        let engine = engine_with(provider.clone());

        let outcome = engine
            .run_turn(TurnRequest::new("Build an app"))
            .await
            .unwrap();

        assert_eq!(provider.compose_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.final_answer, "scripted final answer");
        assert!(outcome.analyses.moderator_aggregation.is_some());
    }

    #[tokio::test]
    async fn debate_decision_runs_the_debate_node() {
        let provider = Arc::new(ScriptedProvider::new().with_verdicts(vec![
            SupervisorVerdict {
                decision: SupervisorDecision::Debate,
                next_agent: None,
                reasoning: "conflicting analyses".into(),
            },
            end_verdict(),
        ]));
        let engine = engine_with(provider.clone());

        let outcome = engine
            .run_turn(TurnRequest::new("Build an app").with_debate_content("A says X, B says Y"))
            .await
            .unwrap();

        assert!(outcome.analyses.debate_resolution.is_some());
        assert_eq!(outcome.debate_category, Some(DebateCategory::Moderator));
        assert!(outcome
            .agent_history
            .iter()
            .any(|e| e.actor == Actor::DebateAnalyzer));
    }

    #[tokio::test]
    async fn provider_fault_aborts_the_turn() {
        let provider = Arc::new(ScriptedProvider::new().failing_decisions());
        let engine = engine_with(provider);
        let result = engine.run_turn(TurnRequest::new("Build an app")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn specialist_fault_aborts_the_turn() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_verdicts(vec![continue_to(AgentKind::DomainExpert)])
                .failing_analyses(),
        );
        let engine = engine_with(provider);
        let result = engine.run_turn(TurnRequest::new("Build an app")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn turn_without_thread_id_gets_a_generated_one() {
        let provider = Arc::new(ScriptedProvider::new().with_verdicts(vec![end_verdict()]));
        let engine = engine_with(provider);
        let outcome = engine.run_turn(TurnRequest::new("Build an app")).await.unwrap();
        assert!(!outcome.thread_id.is_empty());
    }

    #[tokio::test]
    async fn get_context_on_empty_thread_is_empty_not_an_error() {
        let provider = Arc::new(ScriptedProvider::new());
        let engine = engine_with(provider);
        let context = engine.get_context("nobody").await;
        assert!(!context.has_context);
        assert_eq!(context.conversation_count, 0);
        assert!(context.history.is_empty());
        assert!(context.error.is_none());
    }

    #[tokio::test]
    async fn finished_turn_is_visible_through_get_context() {
        let provider = Arc::new(ScriptedProvider::new().with_verdicts(vec![end_verdict()]));
        let engine = engine_with(provider);
        engine
            .run_turn(TurnRequest::new("Build an app").with_thread_id("t1"))
            .await
            .unwrap();

        let context = engine.get_context("t1").await;
        assert!(context.has_context);
        assert!(context.conversation_count > 0);
        assert_eq!(context.memory_context.len(), 1);
        assert_eq!(context.memory_context[0].user_query, "Build an app");
    }
}
