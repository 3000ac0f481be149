//! Generative-client error types.

use thiserror::Error;

/// Why a generative call produced no usable answer.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with a status that retrying will not fix.
    #[error("generation request rejected: {0}")]
    RequestFailed(String),

    /// The answer held no parseable JSON.
    #[error("answer is not valid JSON: {0}")]
    ParseError(String),

    /// The JSON did not have the expected shape.
    #[error("answer does not match the expected schema: {0}")]
    SchemaValidation(String),

    /// The HTTP client gave up waiting.
    #[error("generation timed out after {0}ms")]
    Timeout(u64),

    /// No provider configured, or it could not be reached.
    #[error("generative provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered 429.
    #[error("generative provider rate limited the request")]
    RateLimited {
        /// Delay the provider asked for, if it sent `Retry-After`.
        retry_after_ms: Option<u64>,
    },

    /// No API key configured, or the provider rejected it.
    #[error("credential missing or rejected: {0}")]
    AuthMissing(String),

    /// Transient failures on every attempt.
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Bad provider name, prompt file or similar.
    #[error("generation config error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unavailable(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}
