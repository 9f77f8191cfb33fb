//! Scripted provider for engine tests.

use async_trait::async_trait;
use roundtable_core::agents::{AnalysisKind, SupervisorDecision};
use roundtable_core::error::ProviderError;
use roundtable_core::provider::{AnalysisProvider, SupervisorVerdict};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) fn analysis_text(kind: AnalysisKind) -> String {
    let label = match kind {
        AnalysisKind::DomainExpert => "domain",
        AnalysisKind::UxUiSpecialist => "ux",
        AnalysisKind::TechnicalArchitect => "technical",
        AnalysisKind::RevenueModelAnalyst => "revenue",
        AnalysisKind::Moderator => "moderator",
        AnalysisKind::Debate => "debate",
    };
    format!("scripted {label} analysis")
}

/// A provider that returns a queued sequence of verdicts and canned
/// analysis text, counting every call.
pub(crate) struct ScriptedProvider {
    verdicts: Mutex<VecDeque<SupervisorVerdict>>,
    fallback_verdict: Option<SupervisorVerdict>,
    fail_decisions: bool,
    fail_analyses: bool,
    final_answer: String,
    pub(crate) decide_calls: AtomicUsize,
    pub(crate) analyze_calls: AtomicUsize,
    pub(crate) compose_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            verdicts: Mutex::new(VecDeque::new()),
            fallback_verdict: None,
            fail_decisions: false,
            fail_analyses: false,
            final_answer: "scripted final answer".into(),
            decide_calls: AtomicUsize::new(0),
            analyze_calls: AtomicUsize::new(0),
            compose_calls: AtomicUsize::new(0),
        }
    }

    /// Queue verdicts returned in order by `decide_next`.
    pub(crate) fn with_verdicts(self, verdicts: Vec<SupervisorVerdict>) -> Self {
        *self.verdicts.lock().unwrap() = verdicts.into();
        self
    }

    /// Verdict returned once the queue is exhausted.
    pub(crate) fn with_fallback(mut self, verdict: SupervisorVerdict) -> Self {
        self.fallback_verdict = Some(verdict);
        self
    }

    pub(crate) fn failing_decisions(mut self) -> Self {
        self.fail_decisions = true;
        self
    }

    pub(crate) fn failing_analyses(mut self) -> Self {
        self.fail_analyses = true;
        self
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn analyze(&self, kind: AnalysisKind, _prompt: &str) -> Result<String, ProviderError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_analyses {
            return Err(ProviderError::Network("scripted analysis failure".into()));
        }
        Ok(analysis_text(kind))
    }

    async fn decide_next(&self, _prompt: &str) -> Result<SupervisorVerdict, ProviderError> {
        self.decide_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_decisions {
            return Err(ProviderError::Timeout("scripted decision failure".into()));
        }
        if let Some(verdict) = self.verdicts.lock().unwrap().pop_front() {
            return Ok(verdict);
        }
        match &self.fallback_verdict {
            Some(verdict) => Ok(verdict.clone()),
            None => Ok(SupervisorVerdict {
                decision: SupervisorDecision::End,
                next_agent: None,
                reasoning: "script exhausted".into(),
            }),
        }
    }

    async fn compose_final(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.compose_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.final_answer.clone())
    }
}
