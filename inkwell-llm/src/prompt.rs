//! Prompt templates for Inkwell generative calls.
//!
//! Every prompt is a versioned, testable artifact. The built-ins below are
//! compiled in; `prompts/v1/*.toml` carries the same templates for editing
//! without a rebuild.

/// Grammar review system prompt.
pub const GRAMMAR_REVIEW_SYSTEM: &str = r"You are a meticulous {language} proofreader.
You find spelling, spacing, grammar and style problems in the user's text.

RULES:
- Quote every problem exactly as it appears in the text. Never paraphrase it.
- Quote the shortest substring that contains the problem.
- If the same substring occurs more than once, give its character offset.
- Do not report changes that leave the text identical.
- Your response must be valid JSON.";

/// Grammar review user prompt.
pub const GRAMMAR_REVIEW_USER: &str = r#"{context_block}[Text]
{text}

Return JSON:
{{"findings": [{{"original": "exact substring", "correction": "fixed text", "category": "spelling|spacing|grammar|style", "confidence": <float 0.0-1.0>, "explanation": "why", "offset": <character offset or null>}}]}}
If there are no problems, return {{"findings": []}}."#;

/// Next-sentence system prompt.
pub const NEXT_SENTENCE_SYSTEM: &str = r"You are a creative {language} writing assistant.
You suggest natural, logical sentences that continue the user's text.";

/// Next-sentence user prompt.
pub const NEXT_SENTENCE_USER: &str = r#"This is the text the user is writing:

[Current text]
{text}

Considering its context, suggest {count} different sentences that could come next.
Each suggestion must take a different direction.

Return JSON:
{{"suggestions": [{{"text": "sentence", "rationale": "direction in a few words"}}]}}
Write only the suggestions, no other commentary."#;

/// Logic review system prompt.
pub const LOGIC_REVIEW_SYSTEM: &str = r"You are an expert in logical {language} writing.";

/// Logic review user prompt.
pub const LOGIC_REVIEW_USER: &str = r#"Analyze the logical structure of this text:

[Text]
{text}

Cover:
1. Claim: the core claim of the text
2. Evidence: what supports the claim
3. Flow: whether the sentences connect naturally
4. Improvements: what needs shoring up logically

Return JSON:
{{"claim": "...", "evidence": "...", "flow": "...", "improvements": ["..."], "has_issues": <bool>}}
Keep it brief."#;

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value in a single pass over the
/// template, so substituted values are copied verbatim and never expanded.
/// `{{` and `}}` are literal braces. Unknown placeholders are kept as-is.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{{").or_else(|| tail.strip_prefix("}}")) {
            result.push_str(&tail[..1]);
            rest = after;
            continue;
        }
        let placeholder = tail
            .strip_prefix('{')
            .and_then(|t| t.split_once('}'))
            .filter(|(name, _)| is_placeholder_name(name));
        match placeholder {
            Some((name, after)) => {
                match vars.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => result.push_str(value),
                    None => {
                        result.push('{');
                        result.push_str(name);
                        result.push('}');
                    }
                }
                rest = after;
            }
            None => {
                result.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// PromptEngine: Versioned TOML Template Loader
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::LlmError;

/// Identifies a prompt template by purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Spelling/grammar findings anchored to substrings.
    GrammarReview,
    /// Candidate next sentences.
    NextSentence,
    /// Claim/evidence/flow review.
    LogicReview,
}

impl PromptId {
    /// Returns the TOML filename (without path) for this prompt.
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            Self::GrammarReview => "grammar_review.toml",
            Self::NextSentence => "next_sentence.toml",
            Self::LogicReview => "logic_review.toml",
        }
    }

    /// All prompt IDs.
    #[must_use]
    pub fn all() -> &'static [PromptId] {
        &[Self::GrammarReview, Self::NextSentence, Self::LogicReview]
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GrammarReview => "grammar_review",
            Self::NextSentence => "next_sentence",
            Self::LogicReview => "logic_review",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grammar_review" => Ok(Self::GrammarReview),
            "next_sentence" => Ok(Self::NextSentence),
            "logic_review" => Ok(Self::LogicReview),
            _ => Err(format!("unknown prompt id: '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TomlPromptFile {
    prompt: TomlPromptData,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlPromptData {
    version: String,
    system: String,
    user: String,
}

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Prompt version string (e.g., "1.0").
    pub version: String,
    /// System prompt template (contains `{key}` placeholders).
    pub system: String,
    /// User prompt template (contains `{key}` placeholders).
    pub user: String,
}

impl PromptTemplate {
    fn builtin(system: &str, user: &str) -> Self {
        Self {
            version: "builtin".into(),
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Engine that loads versioned TOML prompt templates and renders them.
///
/// # Example
///
/// ```no_run
/// use inkwell_llm::prompt::{PromptEngine, PromptId};
///
/// let engine = PromptEngine::from_directory("inkwell-llm/prompts/v1").unwrap();
/// let (system, user) = engine
///     .render(PromptId::NextSentence, &[("language", "Korean"), ("text", "..."), ("count", "3")])
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PromptEngine {
    templates: HashMap<PromptId, PromptTemplate>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptEngine {
    /// Create a `PromptEngine` pre-loaded with the compiled-in templates.
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            PromptId::GrammarReview,
            PromptTemplate::builtin(GRAMMAR_REVIEW_SYSTEM, GRAMMAR_REVIEW_USER),
        );
        templates.insert(
            PromptId::NextSentence,
            PromptTemplate::builtin(NEXT_SENTENCE_SYSTEM, NEXT_SENTENCE_USER),
        );
        templates.insert(
            PromptId::LogicReview,
            PromptTemplate::builtin(LOGIC_REVIEW_SYSTEM, LOGIC_REVIEW_USER),
        );
        Self { templates }
    }

    /// Load prompt templates from a directory of TOML files.
    ///
    /// Each TOML file must match a known [`PromptId`] filename. Ids without
    /// a file keep their built-in template.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if a file cannot be read or parsed,
    /// or if the directory holds no known prompt file.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        let mut engine = Self::builtin();
        let mut loaded = 0usize;

        for id in PromptId::all() {
            let path = dir.join(id.filename());
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| {
                LlmError::ConfigError(format!("failed to read {}: {e}", path.display()))
            })?;
            let parsed: TomlPromptFile = toml::from_str(&content).map_err(|e| {
                LlmError::ConfigError(format!("failed to parse {}: {e}", path.display()))
            })?;

            let d = parsed.prompt;
            engine.templates.insert(
                *id,
                PromptTemplate {
                    version: d.version,
                    system: d.system,
                    user: d.user,
                },
            );
            loaded += 1;
        }

        if loaded == 0 {
            return Err(LlmError::ConfigError(format!(
                "no prompt templates found in directory: {}",
                dir.display()
            )));
        }
        Ok(engine)
    }

    /// Get a loaded prompt template by ID.
    #[must_use]
    pub fn get(&self, id: PromptId) -> Option<&PromptTemplate> {
        self.templates.get(&id)
    }

    /// Render both system and user prompts for a given ID.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the prompt ID is not loaded.
    pub fn render(&self, id: PromptId, vars: &[(&str, &str)]) -> Result<(String, String), LlmError> {
        let tpl = self
            .get(id)
            .ok_or_else(|| LlmError::ConfigError(format!("prompt template '{id}' not loaded")))?;
        Ok((render_template(&tpl.system, vars), render_template(&tpl.user, vars)))
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
