//! Logic-structure review with a rule-based fallback.

use std::sync::Arc;

use inkwell_core::analysis::{basic_summary, sentence_count};
use inkwell_llm::prompt::{PromptEngine, PromptId};
use inkwell_llm::types::{LogicReview, parse_structured};
use inkwell_llm::{LlmError, LlmRequest, TextGenerator};
use serde::Serialize;
use tracing::{debug, warn};

use crate::ai::{AiGate, ReviewSettings};

/// Who produced a [`LogicAnalysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// The generative service.
    Ai,
    /// Sentence statistics only.
    RuleBased,
}

/// Result of a logic review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicAnalysis {
    /// Human-readable review.
    pub analysis: String,
    /// Whether something should be shored up.
    pub has_issues: bool,
    /// Concrete improvements, if the reviewer named any.
    pub improvements: Vec<String>,
    /// Non-empty sentences in the text.
    pub sentence_count: usize,
    /// Who produced it.
    pub source: AnalysisSource,
}

impl LogicAnalysis {
    /// Statistics-only analysis.
    #[must_use]
    pub fn rule_based(text: &str) -> Self {
        Self {
            analysis: basic_summary(text),
            has_issues: false,
            improvements: Vec::new(),
            sentence_count: sentence_count(text),
            source: AnalysisSource::RuleBased,
        }
    }
}

/// Reviews claim, evidence and flow.
#[derive(Clone)]
pub struct LogicAnalyzer {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptEngine>,
    gate: AiGate,
    settings: ReviewSettings,
}

impl std::fmt::Debug for LogicAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicAnalyzer")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl LogicAnalyzer {
    /// Create an analyzer sharing `gate` with the checkers.
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptEngine>,
        gate: AiGate,
        settings: ReviewSettings,
    ) -> Self {
        Self {
            generator,
            prompts,
            gate,
            settings,
        }
    }

    /// Review `text`. Never fails: any problem yields the rule-based analysis.
    pub async fn analyze(&self, text: &str) -> LogicAnalysis {
        if text.trim().is_empty() || !self.gate.is_open() || !self.generator.has_credential() {
            return LogicAnalysis::rule_based(text);
        }
        match self.review(text).await {
            Ok(review) => {
                let mut analysis = format!(
                    "Claim: {}\nEvidence: {}\nFlow: {}",
                    review.claim, review.evidence, review.flow
                );
                if !review.improvements.is_empty() {
                    analysis.push_str("\nImprovements:");
                    for item in &review.improvements {
                        analysis.push_str("\n- ");
                        analysis.push_str(item);
                    }
                }
                LogicAnalysis {
                    analysis,
                    has_issues: review.has_issues || !review.improvements.is_empty(),
                    improvements: review.improvements,
                    sentence_count: sentence_count(text),
                    source: AnalysisSource::Ai,
                }
            }
            Err(LlmError::AuthMissing(reason)) => {
                warn!(%reason, "logic review unauthorized");
                self.gate.close();
                LogicAnalysis::rule_based(text)
            }
            Err(e) => {
                warn!(error = %e, "logic review failed, using rule-based analysis");
                LogicAnalysis::rule_based(text)
            }
        }
    }

    async fn review(&self, text: &str) -> Result<LogicReview, LlmError> {
        let (system, user) = self.prompts.render(
            PromptId::LogicReview,
            &[("language", self.settings.language.as_str()), ("text", text)],
        )?;
        let request = LlmRequest::review(system, user)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_timeout(self.settings.timeout_ms);
        let response = self.generator.generate(&request).await?;
        debug!(latency_ms = response.latency_ms, "logic review answered");
        parse_structured(&response.text)
    }
}
