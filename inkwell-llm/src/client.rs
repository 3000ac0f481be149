//! LLM Client: unified interface for OpenAI-compatible and Ollama backends.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Clone)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// Base URL, e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat-completions API.
    OpenAiCompatible {
        /// Base URL, e.g. `https://api.openai.com`.
        base_url: String,
        /// Bearer token. `None` means no credential was configured.
        api_key: Option<String>,
    },
    /// No LLM available. All calls fail with [`LlmError::Unavailable`].
    None,
}

impl fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama { base_url } => f.debug_struct("Ollama").field("base_url", base_url).finish(),
            Self::OpenAiCompatible { base_url, api_key } => f
                .debug_struct("OpenAiCompatible")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::None => f.write_str("None"),
        }
    }
}

impl LlmProvider {
    /// Build a provider from its config name (`openai`, `ollama`, `none`).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider name.
    pub fn from_name(
        name: &str,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        match name.to_ascii_lowercase().as_str() {
            "openai" | "openai_compatible" => Ok(Self::OpenAiCompatible {
                base_url: base_url.into(),
                api_key,
            }),
            "ollama" => Ok(Self::Ollama {
                base_url: base_url.into(),
            }),
            "none" => Ok(Self::None),
            other => Err(LlmError::ConfigError(format!("unknown provider: {other}"))),
        }
    }
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(Response),
    /// Worth another try (5xx, network, timeout).
    Transient(String),
}

/// The LLM client that routes requests to the configured backend.
#[derive(Debug)]
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            max_retries,
        }
    }

    /// Create a client with no LLM backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a response from the LLM.
    ///
    /// # Errors
    ///
    /// - [`LlmError::AuthMissing`] without a key (no call is made) or on 401/403.
    /// - [`LlmError::RateLimited`] on 429, without retrying.
    /// - [`LlmError::RetriesExhausted`] when 5xx or network failures persist.
    /// - [`LlmError::RequestFailed`] on any other non-success status.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => self.generate_ollama(base_url, request).await,
            LlmProvider::OpenAiCompatible { base_url, api_key } => match api_key.as_deref() {
                Some(key) if !key.trim().is_empty() => {
                    self.generate_openai(base_url, key, request).await
                }
                _ => Err(LlmError::AuthMissing("no API key configured".into())),
            },
        }
    }

    async fn generate_ollama(
        &self,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));
        let mut body = json!({
            "model": self.model,
            "prompt": format!("{}\n\n{}", request.system, request.user),
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });
        if request.json_output {
            body["format"] = json!("json");
        }

        let started = Instant::now();
        let json = self
            .send_with_retries(request, || self.http.post(&url).json(&body))
            .await?;
        Ok(LlmResponse {
            text: json["response"].as_str().unwrap_or_default().to_string(),
            tokens_generated: token_count(&json["eval_count"]),
            latency_ms: elapsed_ms(started),
            model: self.model.clone(),
        })
    }

    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if request.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let started = Instant::now();
        let json = self
            .send_with_retries(request, || {
                self.http
                    .post(&url)
                    .header("Authorization", format!("Bearer {api_key}"))
                    .json(&body)
            })
            .await?;
        Ok(LlmResponse {
            text: json["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            tokens_generated: token_count(&json["usage"]["completion_tokens"]),
            latency_ms: elapsed_ms(started),
            model: self.model.clone(),
        })
    }

    /// Shared retry loop. Only transient failures are retried.
    async fn send_with_retries<F>(&self, request: &LlmRequest, build: F) -> Result<Value, LlmError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(
                    "Retrying LLM call (attempt {}/{})",
                    attempt + 1,
                    self.max_retries + 1
                );
            }

            let result = build()
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;

            match classify(result, request.timeout_ms).await? {
                Attempt::Done(resp) => {
                    return resp
                        .json::<Value>()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()));
                }
                Attempt::Transient(reason) => {
                    warn!("LLM call failed: {reason}");
                    last_error = reason;
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Whether a call could be authorized. Ollama needs no key.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        match &self.provider {
            LlmProvider::OpenAiCompatible { api_key, .. } => {
                api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            }
            LlmProvider::Ollama { .. } => true,
            LlmProvider::None => false,
        }
    }
}

async fn classify(
    result: Result<Response, reqwest::Error>,
    timeout_ms: u64,
) -> Result<Attempt, LlmError> {
    let resp = match result {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => {
            return Ok(Attempt::Transient(format!("timed out after {timeout_ms}ms")));
        }
        Err(e) => return Ok(Attempt::Transient(e.to_string())),
    };

    let status = resp.status();
    if status.is_success() {
        return Ok(Attempt::Done(resp));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited {
            retry_after_ms: retry_after_ms(&resp),
        });
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(LlmError::AuthMissing(format!("provider answered HTTP {status}")));
    }
    let body = resp.text().await.unwrap_or_default();
    if status.is_server_error() {
        Ok(Attempt::Transient(format!("HTTP {status}: {body}")))
    } else {
        Err(LlmError::RequestFailed(format!("HTTP {status}: {body}")))
    }
}

/// `Retry-After` in seconds, converted to milliseconds.
fn retry_after_ms(resp: &Response) -> Option<u64> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
