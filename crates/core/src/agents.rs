//! Agent, decision, and classification identifiers.
//!
//! Every identifier is a closed enum with exactly one canonical string
//! form, used at every persistence and comparison boundary. Raw-string
//! comparisons against `.value`-style accessors are deliberately
//! impossible here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five specialist agents the supervisor can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    DomainExpert,
    UxUiSpecialist,
    TechnicalArchitect,
    RevenueModelAnalyst,
    Moderator,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::DomainExpert,
        AgentKind::UxUiSpecialist,
        AgentKind::TechnicalArchitect,
        AgentKind::RevenueModelAnalyst,
        AgentKind::Moderator,
    ];

    /// The canonical serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::DomainExpert => "domain_expert",
            AgentKind::UxUiSpecialist => "ux_ui_specialist",
            AgentKind::TechnicalArchitect => "technical_architect",
            AgentKind::RevenueModelAnalyst => "revenue_model_analyst",
            AgentKind::Moderator => "moderator",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "domain_expert" => Ok(AgentKind::DomainExpert),
            "ux_ui_specialist" => Ok(AgentKind::UxUiSpecialist),
            "technical_architect" => Ok(AgentKind::TechnicalArchitect),
            "revenue_model_analyst" => Ok(AgentKind::RevenueModelAnalyst),
            "moderator" => Ok(AgentKind::Moderator),
            other => Err(format!("unknown agent kind: {other}")),
        }
    }
}

/// The supervisor's routing verdict for the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorDecision {
    Continue,
    Debate,
    End,
}

impl SupervisorDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorDecision::Continue => "continue",
            SupervisorDecision::Debate => "debate",
            SupervisorDecision::End => "end",
        }
    }
}

impl fmt::Display for SupervisorDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupervisorDecision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "continue" => Ok(SupervisorDecision::Continue),
            "debate" => Ok(SupervisorDecision::Debate),
            "end" => Ok(SupervisorDecision::End),
            other => Err(format!("unknown supervisor decision: {other}")),
        }
    }
}

/// Who produced a history entry or a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Supervisor,
    DomainExpert,
    UxUiSpecialist,
    TechnicalArchitect,
    RevenueModelAnalyst,
    Moderator,
    DebateAnalyzer,
    Finalizer,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Supervisor => "supervisor",
            Actor::DomainExpert => "domain_expert",
            Actor::UxUiSpecialist => "ux_ui_specialist",
            Actor::TechnicalArchitect => "technical_architect",
            Actor::RevenueModelAnalyst => "revenue_model_analyst",
            Actor::Moderator => "moderator",
            Actor::DebateAnalyzer => "debate_analyzer",
            Actor::Finalizer => "finalizer",
        }
    }

    /// Whether this actor is one of the five specialists.
    pub fn is_specialist(&self) -> bool {
        self.as_agent_kind().is_some()
    }

    /// The specialist this actor corresponds to, if any.
    pub fn as_agent_kind(&self) -> Option<AgentKind> {
        match self {
            Actor::DomainExpert => Some(AgentKind::DomainExpert),
            Actor::UxUiSpecialist => Some(AgentKind::UxUiSpecialist),
            Actor::TechnicalArchitect => Some(AgentKind::TechnicalArchitect),
            Actor::RevenueModelAnalyst => Some(AgentKind::RevenueModelAnalyst),
            Actor::Moderator => Some(AgentKind::Moderator),
            _ => None,
        }
    }
}

impl From<AgentKind> for Actor {
    fn from(kind: AgentKind) -> Self {
        match kind {
            AgentKind::DomainExpert => Actor::DomainExpert,
            AgentKind::UxUiSpecialist => Actor::UxUiSpecialist,
            AgentKind::TechnicalArchitect => Actor::TechnicalArchitect,
            AgentKind::RevenueModelAnalyst => Actor::RevenueModelAnalyst,
            AgentKind::Moderator => Actor::Moderator,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an analysis call is asked to produce: one of the five specialist
/// analyses, or a debate resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    DomainExpert,
    UxUiSpecialist,
    TechnicalArchitect,
    RevenueModelAnalyst,
    Moderator,
    Debate,
}

impl From<AgentKind> for AnalysisKind {
    fn from(kind: AgentKind) -> Self {
        match kind {
            AgentKind::DomainExpert => AnalysisKind::DomainExpert,
            AgentKind::UxUiSpecialist => AnalysisKind::UxUiSpecialist,
            AgentKind::TechnicalArchitect => AnalysisKind::TechnicalArchitect,
            AgentKind::RevenueModelAnalyst => AnalysisKind::RevenueModelAnalyst,
            AgentKind::Moderator => AnalysisKind::Moderator,
        }
    }
}

/// Where the follow-up classifier routes a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Enter the normal supervisor decision loop.
    Supervisor,
    /// Bypass the supervisor and jump straight to one specialist.
    Specialist(AgentKind),
}

/// Coarse classification of the user query, derived from its wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    General,
    Revenue,
    UxUi,
    Technical,
    Domain,
}

/// Which specialist a detected debate should be resolved by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateCategory {
    Moderator,
    Domain,
    UxUi,
    Technical,
    Revenue,
}
