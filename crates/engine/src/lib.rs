//! Roundtable engine — the turn-based routing core.
//!
//! Ties the follow-up classifier, the supervisor decision engine, and
//! the persistence stores into two public operations:
//!
//! - [`TurnEngine::run_turn`] — run one conversation turn end to end.
//! - [`TurnEngine::get_context`] — best-effort context read for a thread.
//!
//! The engine consumes an [`AnalysisProvider`] for every LLM-shaped call
//! and never talks to a backend directly.
//!
//! [`AnalysisProvider`]: roundtable_core::AnalysisProvider

pub mod classifier;
pub mod orchestrator;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::{classify_query, route_followup};
pub use orchestrator::{ContextView, TurnEngine, TurnOutcome, TurnRequest};
pub use supervisor::Supervisor;
