//! Check-layer error taxonomy.

use inkwell_llm::LlmError;
use thiserror::Error;

/// Why an external service produced no usable answer.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Network failure, 5xx, or timeout.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service answered 429.
    #[error("service rate limited the request")]
    RateLimited,

    /// No credential, or the credential was rejected.
    #[error("credential missing or rejected")]
    AuthMissing,

    /// The service answered, but not in a form we understand.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl CheckError {
    /// Whether retrying later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::RateLimited)
    }
}

impl From<LlmError> for CheckError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited { .. } => Self::RateLimited,
            LlmError::AuthMissing(_) => Self::AuthMissing,
            LlmError::ParseError(msg) | LlmError::SchemaValidation(msg) => {
                Self::MalformedResponse(msg)
            }
            other @ (LlmError::RequestFailed(_)
            | LlmError::Timeout(_)
            | LlmError::Unavailable(_)
            | LlmError::RetriesExhausted { .. }
            | LlmError::ConfigError(_)) => Self::ServiceUnavailable(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for CheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::ServiceUnavailable(err.to_string())
        }
    }
}

/// Result alias for check operations.
pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_errors_map_onto_four_kinds() {
        assert!(matches!(
            CheckError::from(LlmError::RateLimited { retry_after_ms: Some(1000) }),
            CheckError::RateLimited
        ));
        assert!(matches!(
            CheckError::from(LlmError::AuthMissing("no key".into())),
            CheckError::AuthMissing
        ));
        assert!(matches!(
            CheckError::from(LlmError::SchemaValidation("bad".into())),
            CheckError::MalformedResponse(_)
        ));
        assert!(matches!(
            CheckError::from(LlmError::Timeout(12_000)),
            CheckError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            CheckError::from(LlmError::RetriesExhausted { attempts: 2, last_error: "HTTP 503".into() }),
            CheckError::ServiceUnavailable(_)
        ));
    }

    #[test]
    fn transient_kinds() {
        assert!(CheckError::RateLimited.is_transient());
        assert!(CheckError::ServiceUnavailable("down".into()).is_transient());
        assert!(!CheckError::AuthMissing.is_transient());
        assert!(!CheckError::MalformedResponse("x".into()).is_transient());
    }
}
