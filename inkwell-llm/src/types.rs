//! Core types for LLM requests and responses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::LlmError;

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (role, rules, output format).
    pub system: String,
    /// User prompt (the text and the task).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Ask the provider for a JSON-only answer.
    pub json_output: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// Create a low-temperature review request (grammar, logic).
    #[must_use]
    pub fn review(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 500,
            temperature: 0.2,
            json_output: true,
            timeout_ms: 30_000,
        }
    }

    /// Create a higher-temperature generation request (suggestions).
    #[must_use]
    pub fn creative(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 500,
            temperature: 0.7,
            json_output: true,
            timeout_ms: 30_000,
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Toggle JSON-only output.
    #[must_use]
    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

impl LlmResponse {
    /// Response carrying only text (test doubles, canned answers).
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens_generated: 0,
            latency_ms: 0,
            model: String::new(),
        }
    }
}

/// Structured grammar-review answer.
///
/// Items are decoded one by one: an item whose `original` is not a string
/// is dropped, and any other field that does not decode becomes its
/// default, so one sloppy finding never costs its siblings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsResponse {
    /// Every problem the model found.
    #[serde(default, deserialize_with = "lenient_findings")]
    pub findings: Vec<RawFinding>,
}

/// One grammar finding as the model reports it, before anchoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFinding {
    /// Exact substring of the input that is wrong.
    #[serde(default, alias = "source", alias = "text")]
    pub original: String,
    /// Replacement text.
    #[serde(default, alias = "fix", alias = "suggestion", deserialize_with = "lenient_or_default")]
    pub correction: String,
    /// Model's own tag (spelling, spacing, grammar, style).
    #[serde(default, alias = "type", deserialize_with = "lenient")]
    pub category: Option<String>,
    /// Self-reported confidence.
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f32>,
    /// Why the change is needed.
    #[serde(default, alias = "reason", deserialize_with = "lenient")]
    pub explanation: Option<String>,
    /// Approximate character offset of `original`, if the model gave one.
    #[serde(default, alias = "position", deserialize_with = "lenient")]
    pub offset: Option<usize>,
}

/// Decode raw JSON items into findings, dropping the ones that cannot be
/// anchored at all.
#[must_use]
pub fn findings_from_values(values: Vec<Value>) -> Vec<RawFinding> {
    let total = values.len();
    let findings: Vec<RawFinding> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawFinding>(value) {
            Ok(finding) => Some(finding),
            Err(e) => {
                debug!(error = %e, "dropping undecodable finding");
                None
            }
        })
        .collect();
    if findings.len() < total {
        debug!(dropped = total - findings.len(), kept = findings.len(), "partial findings batch");
    }
    findings
}

fn lenient_findings<'de, D>(deserializer: D) -> Result<Vec<RawFinding>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(findings_from_values(values))
}

/// A field that does not decode as `T` becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    lenient(deserializer).map(Option::unwrap_or_default)
}

/// Structured next-sentence answer. Accepts an object or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SuggestionsResponse {
    /// `{"suggestions": [...]}`
    Wrapped {
        /// Candidates, best first.
        suggestions: Vec<RawSuggestion>,
    },
    /// `[...]`
    Bare(Vec<RawSuggestion>),
}

impl SuggestionsResponse {
    /// Candidates in the order the model returned them.
    #[must_use]
    pub fn into_candidates(self) -> Vec<RawSuggestion> {
        match self {
            Self::Wrapped { suggestions } | Self::Bare(suggestions) => suggestions,
        }
    }
}

/// One candidate sentence: either a plain string or an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSuggestion {
    /// `"sentence"`
    Plain(String),
    /// `{"text": "sentence", "rationale": "..."}`
    Detailed {
        /// The sentence.
        #[serde(alias = "sentence")]
        text: String,
        /// Direction of the continuation.
        #[serde(default, alias = "direction")]
        rationale: Option<String>,
    },
}

impl RawSuggestion {
    /// Split into text and optional rationale.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<String>) {
        match self {
            Self::Plain(text) => (text, None),
            Self::Detailed { text, rationale } => (text, rationale),
        }
    }
}

/// Structured logic-review answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicReview {
    /// Core claim of the text.
    #[serde(default)]
    pub claim: String,
    /// Evidence supporting it.
    #[serde(default)]
    pub evidence: String,
    /// Whether sentences connect naturally.
    #[serde(default)]
    pub flow: String,
    /// What should be shored up.
    #[serde(default)]
    pub improvements: Vec<String>,
    /// Whether the model thinks anything needs fixing.
    #[serde(default)]
    pub has_issues: bool,
}

/// The JSON payload inside model output: a fenced block if present,
/// otherwise the outermost `{...}` or `[...]`.
#[must_use]
pub fn json_block(text: &str) -> Option<&str> {
    let text = text.trim();
    if let Some(fenced) = fenced_block(text) {
        return Some(fenced);
    }
    let open = text.find(['{', '['])?;
    let close_char = if text[open..].starts_with('{') { '}' } else { ']' };
    let close = text.rfind(close_char)?;
    (close > open).then(|| &text[open..=close])
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```")?;
    let inner = body[..end].trim();
    (inner.starts_with('{') || inner.starts_with('[')).then_some(inner)
}

/// Parse model output as structured JSON of type `T`.
///
/// # Errors
///
/// Returns [`LlmError::ParseError`] when no JSON payload is present and
/// [`LlmError::SchemaValidation`] when it does not match `T`.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let block = json_block(text)
        .ok_or_else(|| LlmError::ParseError(format!("no JSON payload in: '{text}'")))?;
    serde_json::from_str(block)
        .map_err(|e| LlmError::SchemaValidation(format!("{e}; raw payload: '{block}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_block_finds_fenced_payload() {
        let text = "Here you go:\n```json\n{\"findings\": []}\n```\nDone.";
        assert_eq!(json_block(text), Some("{\"findings\": []}"));
    }

    #[test]
    fn json_block_finds_embedded_object() {
        let text = "Sure! {\"a\": {\"b\": 1}} hope this helps";
        assert_eq!(json_block(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn json_block_none_for_prose() {
        assert!(json_block("오류 없음").is_none());
    }

    #[test]
    fn findings_accept_field_aliases() {
        let parsed: FindingsResponse = parse_structured(
            r#"{"findings": [{"source": "됬다", "fix": "됐다", "type": "spelling", "position": 4}]}"#,
        )
        .expect("parses");
        let f = &parsed.findings[0];
        assert_eq!(f.original, "됬다");
        assert_eq!(f.correction, "됐다");
        assert_eq!(f.category.as_deref(), Some("spelling"));
        assert_eq!(f.offset, Some(4));
        assert!(f.confidence.is_none());
    }

    #[test]
    fn mistyped_fields_fall_back_per_finding() {
        let parsed: FindingsResponse = parse_structured(
            r#"{"findings": [
                {"original": "됬다", "correction": "됐다", "confidence": 0.9},
                {"original": "안뇽", "correction": "안녕", "confidence": "high", "offset": -1},
                {"original": 7, "correction": "x"},
                "not an object"
            ]}"#,
        )
        .expect("parses");
        assert_eq!(parsed.findings.len(), 2);
        assert_eq!(parsed.findings[0].confidence, Some(0.9));
        let sloppy = &parsed.findings[1];
        assert_eq!(sloppy.original, "안뇽");
        assert_eq!(sloppy.correction, "안녕");
        assert!(sloppy.confidence.is_none());
        assert!(sloppy.offset.is_none());
    }

    #[test]
    fn suggestions_accept_objects_strings_and_bare_arrays() {
        let wrapped: SuggestionsResponse =
            parse_structured(r#"{"suggestions": [{"text": "하나", "rationale": "이어가기"}, "둘"]}"#)
                .expect("parses");
        let parts: Vec<_> = wrapped.into_candidates().into_iter().map(RawSuggestion::into_parts).collect();
        assert_eq!(parts[0], ("하나".to_string(), Some("이어가기".to_string())));
        assert_eq!(parts[1], ("둘".to_string(), None));

        let bare: SuggestionsResponse = parse_structured(r#"["셋", "넷"]"#).expect("parses");
        assert_eq!(bare.into_candidates().len(), 2);
    }

    #[test]
    fn schema_mismatch_is_reported() {
        let err = parse_structured::<LogicReview>(r#"{"has_issues": "maybe"}"#).expect_err("mismatch");
        assert!(matches!(err, LlmError::SchemaValidation(_)));
    }

    #[test]
    fn request_builders_set_fields() {
        let req = LlmRequest::review("sys", "user").with_timeout(100).with_json_output(false);
        assert_eq!(req.timeout_ms, 100);
        assert!(!req.json_output);
        assert!(LlmRequest::creative("s", "u").temperature > req.temperature);
    }
}
