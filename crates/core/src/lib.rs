//! # Roundtable Core
//!
//! Domain types, traits, and error definitions for the Roundtable
//! multi-agent routing engine. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod agents;
pub mod error;
pub mod memory;
pub mod provider;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use agents::{
    AgentKind, AnalysisKind, Actor, DebateCategory, QueryType, RouteTarget, SupervisorDecision,
};
pub use error::{Error, ProviderError, Result, StorageError};
pub use memory::{MemoryEntry, MemoryStats, Snapshot, Storage, ThreadSummary};
pub use provider::{AnalysisProvider, SupervisorVerdict};
pub use state::{ConversationState, HistoryEntry, StatePatch, TurnConfig};
