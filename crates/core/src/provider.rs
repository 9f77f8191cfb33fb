//! AnalysisProvider trait — the abstraction over the LLM backend.
//!
//! The engine never talks to an LLM directly. Each specialist analysis,
//! the supervisor's routing decision, and the final-answer composition go
//! through this trait. Implementations own their own prompt templates,
//! retries, and timeouts; the orchestrator only propagates their faults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::{AgentKind, AnalysisKind, SupervisorDecision};
use crate::error::ProviderError;

/// The supervisor's structured routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorVerdict {
    /// Continue with a specialist, resolve a debate, or end the turn.
    pub decision: SupervisorDecision,

    /// The specialist to dispatch next. `None` when the provider named an
    /// agent the engine does not know — the router treats that as a safe
    /// fallback to the supervisor, not an error.
    pub next_agent: Option<AgentKind>,

    /// Free-text reasoning behind the decision.
    pub reasoning: String,
}

/// The opaque analysis/decision capability consumed by the engine.
///
/// One call per step: the orchestrator suspends on each call and never
/// fans out across specialists in parallel.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Produce one structured analysis of the given kind.
    async fn analyze(
        &self,
        kind: AnalysisKind,
        prompt: &str,
    ) -> std::result::Result<String, ProviderError>;

    /// Decide the next routing step from the supervisor's context bundle.
    async fn decide_next(
        &self,
        prompt: &str,
    ) -> std::result::Result<SupervisorVerdict, ProviderError>;

    /// Compose the final answer from the moderator aggregation.
    async fn compose_final(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}
