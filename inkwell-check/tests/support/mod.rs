//! Scripted stand-ins for the spell service and the generative service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use inkwell_check::basic::{SpellHit, SpellService};
use inkwell_check::error::CheckError;
use inkwell_core::GrammarError;
use inkwell_core::journal::{ErrorLogSink, UserAction};
use inkwell_llm::{LlmError, LlmRequest, LlmResponse, TextGenerator};
use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Spell service
// ---------------------------------------------------------------------------

/// What the fake spell service does on a call.
#[derive(Debug, Clone)]
pub enum SpellScript {
    /// Answer with these hits.
    Hits(Vec<SpellHit>),
    /// Answer after a delay.
    Slow(Duration, Vec<SpellHit>),
    /// Fail with 5xx.
    Down,
}

pub struct FakeSpell {
    script: Mutex<SpellScript>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeSpell {
    pub fn new(script: SpellScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    pub fn set(&self, script: SpellScript) {
        *self.script.lock() = script;
    }
}

#[async_trait]
impl SpellService for FakeSpell {
    async fn check_chunk(&self, chunk: &str) -> Result<Vec<SpellHit>, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(chunk.to_string());
        let script = self.script.lock().clone();
        match script {
            SpellScript::Hits(hits) => Ok(hits),
            SpellScript::Slow(delay, hits) => {
                tokio::time::sleep(delay).await;
                Ok(hits)
            }
            SpellScript::Down => Err(CheckError::ServiceUnavailable("HTTP 503".into())),
        }
    }
}

pub fn hit(offset: usize, length: usize, suggestion: &str) -> SpellHit {
    SpellHit {
        offset,
        length,
        suggestion: (!suggestion.is_empty()).then(|| suggestion.to_string()),
        kind: None,
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Keeps every journaled finding in memory.
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(String, UserAction)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `(source_text, action)` in recording order.
    pub fn entries(&self) -> Vec<(String, UserAction)> {
        self.entries.lock().clone()
    }
}

impl ErrorLogSink for RecordingSink {
    fn record(&self, error: &GrammarError, action: UserAction) {
        self.entries.lock().push((error.source_text.clone(), action));
    }
}

// ---------------------------------------------------------------------------
// Generative service
// ---------------------------------------------------------------------------

/// One scripted generative answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Slow(Duration, String),
    RateLimited,
    Unauthorized,
    Down,
}

pub struct FakeGenerator {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    credential: bool,
    requests: Mutex<Vec<LlmRequest>>,
}

impl FakeGenerator {
    /// Always answers `fallback`.
    pub fn always(fallback: Reply) -> Arc<Self> {
        Self::scripted(Vec::new(), fallback)
    }

    /// Answers `replies` in order, then `fallback`.
    pub fn scripted(replies: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(replies.into()),
            fallback,
            credential: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// No key configured.
    pub fn keyless() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Reply::Down,
            credential: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().push(request.clone());
        let reply = self.queue.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Text(text) => Ok(LlmResponse::text_only(text)),
            Reply::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(LlmResponse::text_only(text))
            }
            Reply::RateLimited => Err(LlmError::RateLimited { retry_after_ms: None }),
            Reply::Unauthorized => Err(LlmError::AuthMissing("HTTP 401".into())),
            Reply::Down => Err(LlmError::RetriesExhausted {
                attempts: 2,
                last_error: "HTTP 503".into(),
            }),
        }
    }

    fn has_credential(&self) -> bool {
        self.credential
    }
}

/// A JSON findings answer with one entry per `(original, correction)`.
pub fn findings_text(findings: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = findings
        .iter()
        .map(|(original, correction)| {
            serde_json::json!({ "original": original, "correction": correction, "category": "grammar" })
        })
        .collect();
    serde_json::json!({ "findings": items }).to_string()
}

pub fn findings_json(findings: &[(&str, &str)]) -> Reply {
    Reply::Text(findings_text(findings))
}
