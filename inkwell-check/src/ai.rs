//! AI checker: generative grammar review anchored to exact substrings.
//!
//! The model quotes the text it objects to; every quote is located in the
//! snapshot by exact match. Quotes that cannot be found are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use inkwell_core::config::AiConfig;
use inkwell_core::span::{char_len, find_char_offsets};
use inkwell_core::{Category, GrammarError, Origin, TextSpan};
use inkwell_llm::prompt::{PromptEngine, PromptId};
use inkwell_llm::types::{FindingsResponse, RawFinding, findings_from_values, json_block};
use inkwell_llm::{LlmRequest, TextGenerator};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CheckError, Result};

/// Confidence used when the model does not report one.
const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Appended to the rationale when a quote occurs more than once and the
/// model gave no offset.
pub const AMBIGUITY_NOTE: &str = "potentially ambiguous: quoted text occurs more than once";

/// Answers meaning "nothing to fix".
const NO_ERROR_PHRASES: [&str; 3] = ["오류 없음", "no errors", "no error found"];

/// Process-wide switch that turns generative calls off for good.
///
/// Starts open; once closed it never reopens. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct AiGate {
    closed: Arc<AtomicBool>,
}

impl AiGate {
    /// A fresh, open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether generative calls may still be made.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Close the gate. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        if !was_closed {
            info!("generative service disabled for this session");
        }
        !was_closed
    }
}

/// Sampling parameters for the grammar review call.
#[derive(Debug, Clone)]
pub struct ReviewSettings {
    /// Document language named in the prompt.
    pub language: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Token budget.
    pub max_tokens: u32,
    /// HTTP timeout handed to the client.
    pub timeout_ms: u64,
}

impl From<&AiConfig> for ReviewSettings {
    fn from(config: &AiConfig) -> Self {
        Self {
            language: config.language.clone(),
            temperature: config.grammar_temperature,
            max_tokens: config.max_tokens,
            timeout_ms: config.request_timeout_ms,
        }
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self::from(&AiConfig::default())
    }
}

/// Generative grammar reviewer.
#[derive(Clone)]
pub struct AiChecker {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptEngine>,
    gate: AiGate,
    settings: ReviewSettings,
}

impl std::fmt::Debug for AiChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiChecker")
            .field("gate", &self.gate)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AiChecker {
    /// Create a checker that calls `generator` while `gate` is open.
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

    /// The gate this checker honors.
    #[must_use]
    pub fn gate(&self) -> &AiGate {
        &self.gate
    }

    /// Review `text`, optionally with surrounding document context.
    ///
    /// # Errors
    ///
    /// [`CheckError::AuthMissing`] without a call when no credential is
    /// configured or the gate is closed; otherwise whatever the service
    /// returned, mapped onto [`CheckError`].
    pub async fn check(&self, text: &str, document_context: Option<&str>) -> Result<Vec<GrammarError>> {
        if !self.gate.is_open() || !self.generator.has_credential() {
            return Err(CheckError::AuthMissing);
        }

        let context_block = document_context
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("[Context]\n{c}\n\n"))
            .unwrap_or_default();
        let (system, user) = self.prompts.render(
            PromptId::GrammarReview,
            &[
                ("language", self.settings.language.as_str()),
                ("text", text),
                ("context_block", context_block.as_str()),
            ],
        )?;
        let request = LlmRequest::review(system, user)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_timeout(self.settings.timeout_ms);

        let response = self.generator.generate(&request).await?;
        debug!(
            latency_ms = response.latency_ms,
            tokens = response.tokens_generated,
            "grammar review answered"
        );

        let raw = parse_findings(&response.text)?;
        let total = raw.len();
        let findings: Vec<GrammarError> = raw.into_iter().filter_map(|r| anchor(text, r)).collect();
        if findings.len() < total {
            debug!(dropped = total - findings.len(), "dropped unanchored AI findings");
        }
        Ok(findings)
    }
}

/// Locate a model quote in `text` and build the finding.
///
/// Returns `None` when the quote is empty or not found verbatim.
#[must_use]
pub fn anchor(text: &str, raw: RawFinding) -> Option<GrammarError> {
    let original = raw.original.trim();
    if original.is_empty() {
        return None;
    }
    let offsets = find_char_offsets(text, original);
    let ambiguous = raw.offset.is_none() && offsets.len() > 1;
    let start = match raw.offset {
        Some(hint) => offsets.iter().copied().min_by_key(|&o| o.abs_diff(hint))?,
        None => *offsets.first()?,
    };
    let span = TextSpan::new(start, start + char_len(original))?;

    let category = raw
        .category
        .as_deref()
        .map(Category::from_tag)
        .filter(|c| *c != Category::Unknown)
        .unwrap_or(Category::Grammar);
    let confidence = raw.confidence.unwrap_or(DEFAULT_CONFIDENCE);

    let rationale = match (raw.explanation.filter(|e| !e.trim().is_empty()), ambiguous) {
        (Some(e), true) => Some(format!("{e} ({AMBIGUITY_NOTE})")),
        (Some(e), false) => Some(e),
        (None, true) => Some(AMBIGUITY_NOTE.to_string()),
        (None, false) => None,
    };

    let finding = GrammarError::new(
        span,
        original,
        raw.correction.trim(),
        category,
        Origin::Ai,
        confidence,
    );
    Some(match rationale {
        Some(r) => finding.with_rationale(r),
        None => finding,
    })
}

/// Parse a grammar-review answer.
///
/// # Errors
///
/// [`CheckError::MalformedResponse`] when the answer is neither JSON
/// findings, a labeled list, nor an explicit "no errors".
pub fn parse_findings(answer: &str) -> Result<Vec<RawFinding>> {
    if let Some(block) = json_block(answer) {
        match serde_json::from_str::<Value>(block) {
            Ok(value @ Value::Object(_)) if value.get("findings").is_some() => {
                return serde_json::from_value::<FindingsResponse>(value)
                    .map(|r| r.findings)
                    .map_err(|e| CheckError::MalformedResponse(e.to_string()));
            }
            Ok(Value::Array(items)) => return Ok(findings_from_values(items)),
            _ => debug!("grammar review JSON did not match the findings schema"),
        }
    }

    let labeled = parse_labeled(answer);
    if !labeled.is_empty() {
        return Ok(labeled);
    }

    let lowered = answer.to_lowercase();
    if NO_ERROR_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Ok(Vec::new());
    }

    Err(CheckError::MalformedResponse(format!(
        "unrecognized grammar review answer: '{answer}'"
    )))
}

#[derive(Clone, Copy)]
enum Label {
    Kind,
    Original,
    Correction,
    Explanation,
}

fn label_of(line: &str) -> Option<(Label, &str)> {
    const LABELS: [(&str, Label); 10] = [
        ("오류 유형", Label::Kind),
        ("error type", Label::Kind),
        ("type", Label::Kind),
        ("원문", Label::Original),
        ("original", Label::Original),
        ("수정안", Label::Correction),
        ("correction", Label::Correction),
        ("설명", Label::Explanation),
        ("explanation", Label::Explanation),
        ("reason", Label::Explanation),
    ];
    let (head, value) = line.split_once(':')?;
    let head = head.trim().to_lowercase();
    LABELS
        .iter()
        .find(|(name, _)| head == *name)
        .map(|(_, label)| (*label, value))
}

/// Strip list numbering and bullets: `1.`, `2)`, `-`, `*`.
fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if rest.len() < line.len() {
        rest.strip_prefix(['.', ')']).unwrap_or(rest)
    } else {
        rest.strip_prefix(['-', '*', '•']).unwrap_or(rest)
    };
    rest.trim()
}

/// Strip one pair of wrapping brackets or quotes.
fn unwrap_value(value: &str) -> &str {
    let value = value.trim();
    for (open, close) in [('[', ']'), ('"', '"'), ('\'', '\''), ('“', '”'), ('「', '」')] {
        if let Some(inner) = value.strip_prefix(open).and_then(|v| v.strip_suffix(close)) {
            return inner.trim();
        }
    }
    value
}

fn parse_labeled(answer: &str) -> Vec<RawFinding> {
    let mut findings = Vec::new();
    let mut current: Option<RawFinding> = None;

    for line in answer.lines() {
        let Some((label, value)) = label_of(strip_marker(line)) else {
            continue;
        };
        let value = unwrap_value(value).to_string();
        let starts_new = match (&current, label) {
            (None, _) | (Some(_), Label::Kind) => true,
            (Some(c), Label::Original) => !c.original.is_empty(),
            _ => false,
        };
        if starts_new {
            findings.extend(current.take());
            current = Some(RawFinding::default());
        }
        let Some(finding) = current.as_mut() else {
            continue;
        };
        match label {
            Label::Kind => finding.category = Some(value),
            Label::Original => finding.original = value,
            Label::Correction => finding.correction = value,
            Label::Explanation => finding.explanation = Some(value),
        }
    }
    findings.extend(current);
    findings.retain(|f| !f.original.is_empty());
    findings
}
