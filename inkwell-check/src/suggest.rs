//! Next-sentence suggestions.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use inkwell_core::config::{AiConfig, SuggestionConfig};
use inkwell_core::span::tail_chars;
use inkwell_core::SuggestionCandidate;
use inkwell_llm::prompt::{PromptEngine, PromptId};
use inkwell_llm::types::{RawSuggestion, SuggestionsResponse, json_block};
use inkwell_llm::{LlmError, LlmRequest, LlmResponse, TextGenerator};
use tracing::{debug, warn};

use crate::ai::AiGate;
use crate::error::{CheckError, Result};

/// Retries after a 429 before the error surfaces.
const RATE_LIMIT_RETRIES: u32 = 1;

/// Knobs for the suggestion call.
#[derive(Debug, Clone)]
pub struct SuggestSettings {
    /// Document language named in the prompt.
    pub language: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Token budget.
    pub max_tokens: u32,
    /// HTTP timeout handed to the client.
    pub timeout_ms: u64,
    /// Only this many trailing characters are sent.
    pub max_context_chars: usize,
    /// First backoff after a 429; doubles per retry.
    pub backoff_base_ms: u64,
}

impl SuggestSettings {
    /// Settings from the `[ai]` and `[suggestion]` sections.
    #[must_use]
    pub fn from_config(ai: &AiConfig, suggestion: &SuggestionConfig) -> Self {
        Self {
            language: ai.language.clone(),
            temperature: ai.suggestion_temperature,
            max_tokens: ai.max_tokens,
            timeout_ms: ai.request_timeout_ms,
            max_context_chars: suggestion.max_context_chars,
            backoff_base_ms: suggestion.backoff_base_ms,
        }
    }
}

impl Default for SuggestSettings {
    fn default() -> Self {
        Self::from_config(&AiConfig::default(), &SuggestionConfig::default())
    }
}

/// Asks the generative service for candidate next sentences.
#[derive(Clone)]
pub struct SuggestionEngine {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptEngine>,
    gate: AiGate,
    settings: SuggestSettings,
}

impl std::fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionEngine")
            .field("gate", &self.gate)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SuggestionEngine {
    /// Create an engine sharing `gate` with the checkers.
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptEngine>,
        gate: AiGate,
        settings: SuggestSettings,
    ) -> Self {
        Self {
            generator,
            prompts,
            gate,
            settings,
        }
    }

    /// Up to `max_candidates` continuations of `text`, in the service's order.
    ///
    /// Blank text yields an empty list without a call. Duplicates (after
    /// trimming) are dropped and not backfilled, so fewer than
    /// `max_candidates` may come back.
    ///
    /// # Errors
    ///
    /// - [`CheckError::AuthMissing`] immediately when no credential is
    ///   configured or the gate is closed.
    /// - [`CheckError::RateLimited`] when the single backoff retry is also
    ///   rate limited.
    /// - [`CheckError::ServiceUnavailable`] or
    ///   [`CheckError::MalformedResponse`] as the service dictates.
    pub async fn suggest(&self, text: &str, max_candidates: usize) -> Result<Vec<SuggestionCandidate>> {
        if max_candidates == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        if !self.gate.is_open() {
            return Err(CheckError::AuthMissing);
        }
        if !self.generator.has_credential() {
            self.gate.close();
            return Err(CheckError::AuthMissing);
        }

        let context = tail_chars(text, self.settings.max_context_chars);
        let count = max_candidates.to_string();
        let (system, user) = self.prompts.render(
            PromptId::NextSentence,
            &[
                ("language", self.settings.language.as_str()),
                ("text", context),
                ("count", count.as_str()),
            ],
        )?;
        let request = LlmRequest::creative(system, user)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_timeout(self.settings.timeout_ms);

        let response = self.generate_with_backoff(&request).await?;
        let raw = parse_suggestions(&response.text)?;
        let candidates = rank_candidates(raw, max_candidates);
        debug!(candidates = candidates.len(), "suggestions ready");
        Ok(candidates)
    }

    async fn generate_with_backoff(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let mut attempt = 0;
        loop {
            match self.generator.generate(request).await {
                Err(LlmError::RateLimited { .. }) if attempt < RATE_LIMIT_RETRIES => {
                    let delay = self.settings.backoff_base_ms.saturating_mul(1 << attempt);
                    warn!(delay_ms = delay, "suggestion request rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(LlmError::AuthMissing(reason)) => {
                    warn!(%reason, "suggestion request unauthorized");
                    self.gate.close();
                    return Err(CheckError::AuthMissing);
                }
                other => return other.map_err(CheckError::from),
            }
        }
    }
}

/// Parse a suggestion answer: JSON object, bare JSON array, or a
/// numbered/bulleted list.
///
/// # Errors
///
/// [`CheckError::MalformedResponse`] when no candidate can be extracted.
pub fn parse_suggestions(answer: &str) -> Result<Vec<RawSuggestion>> {
    if let Some(block) = json_block(answer) {
        match serde_json::from_str::<SuggestionsResponse>(block) {
            Ok(parsed) => return Ok(parsed.into_candidates()),
            Err(e) => debug!(error = %e, "suggestion JSON did not match, trying list form"),
        }
    }

    let listed: Vec<RawSuggestion> = answer
        .lines()
        .filter_map(list_item)
        .map(|s| RawSuggestion::Plain(s.to_string()))
        .collect();
    if listed.is_empty() {
        return Err(CheckError::MalformedResponse(format!(
            "no suggestions in answer: '{answer}'"
        )));
    }
    Ok(listed)
}

/// The item text of a `1. x`, `2) x`, `- x` or `• x` line.
fn list_item(line: &str) -> Option<&str> {
    let line = line.trim();
    let first = line.chars().next()?;
    let rest = if first.is_ascii_digit() {
        line.trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start_matches(['.', ')', ':'])
    } else if matches!(first, '-' | '•' | '*') {
        &line[first.len_utf8()..]
    } else {
        return None;
    };
    let item = rest.trim().trim_matches(['[', ']', '"']).trim();
    (!item.is_empty()).then_some(item)
}

/// Dedupe on trimmed text, keep the service's index as rank, truncate.
#[must_use]
pub fn rank_candidates(raw: Vec<RawSuggestion>, max_candidates: usize) -> Vec<SuggestionCandidate> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .filter_map(|(rank, suggestion)| {
            let (text, rationale) = suggestion.into_parts();
            let text = text.trim().to_string();
            if text.is_empty() || !seen.insert(text.clone()) {
                return None;
            }
            Some(SuggestionCandidate {
                text,
                rank,
                rationale: rationale.filter(|r| !r.trim().is_empty()),
            })
        })
        .take(max_candidates)
        .collect()
}
