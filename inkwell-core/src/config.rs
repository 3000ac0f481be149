//! Configuration for the Inkwell engine.
//!
//! Maps directly to `inkwell.toml`. Every field has a default, so an empty
//! file (or no file) yields a working basic-only setup.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InkwellConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Debounce and timeouts for check cycles.
    #[serde(default)]
    pub check: CheckConfig,
    /// Rule/dictionary-based spell-check service.
    #[serde(default)]
    pub basic: BasicConfig,
    /// Generative-model service.
    #[serde(default)]
    pub ai: AiConfig,
    /// Next-sentence suggestions.
    #[serde(default)]
    pub suggestion: SuggestionConfig,
    /// Learning-data journal.
    #[serde(default)]
    pub journal: JournalConfig,
}

impl InkwellConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `InkwellError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::InkwellError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject values that would stall or disable the engine.
    ///
    /// # Errors
    /// Returns `InkwellError::Config` naming the first offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        let zero = |field: &str| Err(crate::InkwellError::Config(format!("{field} must be greater than zero")));
        if self.check.debounce_ms == 0 {
            return zero("check.debounce_ms");
        }
        if self.check.adapter_timeout_ms == 0 {
            return zero("check.adapter_timeout_ms");
        }
        if self.basic.max_chunk_chars == 0 {
            return zero("basic.max_chunk_chars");
        }
        if self.suggestion.max_candidates == 0 {
            return zero("suggestion.max_candidates");
        }
        if self.suggestion.max_context_chars == 0 {
            return zero("suggestion.max_context_chars");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Check-cycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Quiet period after the last keystroke before a check starts.
    #[serde(default = "default_2000")]
    pub debounce_ms: u64,
    /// Hard timeout for each adapter call.
    #[serde(default = "default_12000")]
    pub adapter_timeout_ms: u64,
    /// Snapshots shorter than this (after trimming whitespace) skip the check.
    #[serde(default = "default_1_usize")]
    pub min_text_chars: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            adapter_timeout_ms: 12_000,
            min_text_chars: 1,
        }
    }
}

/// Basic spell-check service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicConfig {
    /// Endpoint accepting `{"text": ...}` POSTs.
    #[serde(default = "default_spell_url")]
    pub service_url: String,
    /// Longest text accepted per request, in characters.
    #[serde(default = "default_500")]
    pub max_chunk_chars: usize,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            service_url: default_spell_url(),
            max_chunk_chars: 500,
        }
    }
}

/// Generative-model service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider: "openai", "ollama", "none".
    #[serde(default = "default_openai")]
    pub provider: String,
    /// Base URL for the API.
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature for grammar review.
    #[serde(default = "default_0_2")]
    pub grammar_temperature: f32,
    /// Sampling temperature for suggestions.
    #[serde(default = "default_0_7")]
    pub suggestion_temperature: f32,
    /// Maximum tokens to generate.
    #[serde(default = "default_500_u32")]
    pub max_tokens: u32,
    /// Per-request HTTP timeout in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
    /// Client-side retries for 5xx and network failures.
    #[serde(default = "default_1")]
    pub max_retries: u32,
    /// Language of the documents being checked.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_openai(),
            base_url: default_openai_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            grammar_temperature: 0.2,
            suggestion_temperature: 0.7,
            max_tokens: 500,
            request_timeout_ms: 30_000,
            max_retries: 1,
            language: default_language(),
        }
    }
}

/// Next-sentence suggestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// Candidates requested per call.
    #[serde(default = "default_3")]
    pub max_candidates: usize,
    /// Trailing characters of the document sent as context.
    #[serde(default = "default_1000")]
    pub max_context_chars: usize,
    /// Base delay before the single rate-limit retry.
    #[serde(default = "default_500_u64")]
    pub backoff_base_ms: u64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            max_candidates: 3,
            max_context_chars: 1000,
            backoff_base_ms: 500,
        }
    }
}

/// Error journal (learning data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Whether findings and user actions are recorded.
    #[serde(default)]
    pub enabled: bool,
    /// SQLite database path.
    #[serde(default = "default_journal_path")]
    pub path: String,
    /// Use WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_journal_path(),
            wal_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_spell_url() -> String { "http://localhost:8010/v1/spellcheck".to_string() }
fn default_openai() -> String { "openai".to_string() }
fn default_openai_url() -> String { "https://api.openai.com".to_string() }
fn default_model() -> String { "gpt-4".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_language() -> String { "Korean".to_string() }
fn default_journal_path() -> String { "inkwell.db".to_string() }
fn default_0_2() -> f32 { 0.2 }
fn default_0_7() -> f32 { 0.7 }
fn default_1() -> u32 { 1 }
fn default_1_usize() -> usize { 1 }
fn default_3() -> usize { 3 }
fn default_500() -> usize { 500 }
fn default_500_u32() -> u32 { 500 }
fn default_500_u64() -> u64 { 500 }
fn default_1000() -> usize { 1000 }
fn default_2000() -> u64 { 2000 }
fn default_12000() -> u64 { 12_000 }
fn default_30000() -> u64 { 30_000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = InkwellConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.check.debounce_ms, 2000);
        assert_eq!(config.suggestion.max_candidates, 3);
        assert_eq!(config.basic.max_chunk_chars, 500);
        assert_eq!(config.ai.provider, "openai");
        assert!(!config.journal.enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = InkwellConfig::from_toml(
            r#"
            [check]
            debounce_ms = 750

            [ai]
            provider = "ollama"
            base_url = "http://localhost:11434"
            model = "qwen2.5:7b"
            "#,
        )
        .expect("parses");
        assert_eq!(config.check.debounce_ms, 750);
        assert_eq!(config.check.adapter_timeout_ms, 12_000);
        assert_eq!(config.ai.provider, "ollama");
        assert!((config.ai.grammar_temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_debounce_is_rejected() {
        let err = InkwellConfig::from_toml("[check]\ndebounce_ms = 0\n").expect_err("invalid");
        assert!(err.to_string().contains("check.debounce_ms"));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = InkwellConfig::from_toml("[check\n").expect_err("malformed");
        assert!(matches!(err, crate::InkwellError::Config(_)));
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("inkwell.toml");
        std::fs::write(&path, "[suggestion]\nmax_candidates = 5\n").expect("write");
        let config = InkwellConfig::from_file(&path).expect("load");
        assert_eq!(config.suggestion.max_candidates, 5);
    }
}
