//! Basic checker: the deterministic spell-check service.
//!
//! The service accepts a bounded amount of text per request, so documents
//! are segmented at sentence boundaries and every chunk-local hit is shifted
//! back into document coordinates before it leaves this module.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inkwell_core::config::BasicConfig;
use inkwell_core::segment::segment;
use inkwell_core::span::char_len;
use inkwell_core::{Category, GrammarError, Origin, TextSpan};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CheckError, Result};

/// Confidence of a hit that carries a replacement.
const FIX_CONFIDENCE: f32 = 1.0;
/// Confidence of a hit that only flags the text.
const FLAG_CONFIDENCE: f32 = 0.6;
/// Extra attempts per chunk after a 429.
const RATE_LIMIT_RETRIES: u32 = 1;
const RATE_LIMIT_BACKOFF_MS: u64 = 250;

/// One hit as the spell-check service reports it, in chunk characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellHit {
    /// Character offset inside the chunk.
    pub offset: usize,
    /// Length in characters.
    pub length: usize,
    /// Replacement, if the service knows one.
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Service tag, e.g. `spacing` or `spelling`.
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpellResponse {
    errors: Vec<SpellHit>,
}

/// A spell-check backend that takes one chunk per call.
#[async_trait]
pub trait SpellService: Send + Sync {
    /// Check one chunk.
    async fn check_chunk(&self, chunk: &str) -> Result<Vec<SpellHit>>;
}

/// JSON-over-HTTP spell-check service.
///
/// `POST {url}` with `{"text": chunk}`, answered by `{"errors": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpSpellService {
    http: Client,
    url: String,
    timeout: Duration,
}

impl HttpSpellService {
    /// Create a client for the service at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SpellService for HttpSpellService {
    async fn check_chunk(&self, chunk: &str) -> Result<Vec<SpellHit>> {
        let resp = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "text": chunk }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CheckError::ServiceUnavailable(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CheckError::RateLimited);
        }
        if !status.is_success() {
            return Err(CheckError::ServiceUnavailable(format!("HTTP {status}")));
        }

        let body = resp.text().await?;
        let parsed: SpellResponse = serde_json::from_str(&body)
            .map_err(|e| CheckError::MalformedResponse(format!("{e}; body: '{body}'")))?;
        Ok(parsed.errors)
    }
}

/// Normalizes spell-service hits into [`GrammarError`]s.
#[derive(Clone)]
pub struct BasicChecker {
    service: Arc<dyn SpellService>,
    max_chunk_chars: usize,
}

impl std::fmt::Debug for BasicChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicChecker")
            .field("max_chunk_chars", &self.max_chunk_chars)
            .finish_non_exhaustive()
    }
}

impl BasicChecker {
    /// Wrap `service`, sending at most `max_chunk_chars` characters per call.
    #[must_use]
    pub fn new(service: Arc<dyn SpellService>, max_chunk_chars: usize) -> Self {
        Self {
            service,
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }

    /// HTTP-backed checker from config.
    #[must_use]
    pub fn from_config(config: &BasicConfig, timeout: Duration) -> Self {
        let service = HttpSpellService::new(config.service_url.clone(), timeout);
        Self::new(Arc::new(service), config.max_chunk_chars)
    }

    /// Check the whole document.
    ///
    /// # Errors
    ///
    /// The first chunk failure aborts the check; partial chunk results are
    /// not returned.
    pub async fn check(&self, text: &str) -> Result<Vec<GrammarError>> {
        let chunks = segment(text, self.max_chunk_chars);
        let mut findings = Vec::new();

        for chunk in &chunks {
            let hits = self.check_chunk_with_backoff(&chunk.text).await?;
            let chunk_len = char_len(&chunk.text);
            for hit in hits {
                match normalize(text, chunk.char_offset, chunk_len, &hit) {
                    Some(finding) => findings.push(finding),
                    None => warn!(
                        offset = hit.offset,
                        length = hit.length,
                        chunk_offset = chunk.char_offset,
                        "dropping invalid spell hit"
                    ),
                }
            }
        }

        debug!(chunks = chunks.len(), findings = findings.len(), "basic check done");
        Ok(findings)
    }

    async fn check_chunk_with_backoff(&self, chunk: &str) -> Result<Vec<SpellHit>> {
        let mut attempt = 0;
        loop {
            match self.service.check_chunk(chunk).await {
                Err(CheckError::RateLimited) if attempt < RATE_LIMIT_RETRIES => {
                    let delay = RATE_LIMIT_BACKOFF_MS.saturating_mul(1 << attempt);
                    warn!(delay_ms = delay, "spell service rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn normalize(text: &str, chunk_offset: usize, chunk_len: usize, hit: &SpellHit) -> Option<GrammarError> {
    let end = hit.offset.checked_add(hit.length)?;
    if end > chunk_len {
        return None;
    }
    let span = TextSpan::new(hit.offset, end)?.offset_by(chunk_offset);
    let source = span.slice(text)?;
    let fix = hit.suggestion.as_deref().unwrap_or_default();

    let category = if hit.kind.as_deref().is_some_and(|k| Category::from_tag(k) == Category::Spacing)
        || differs_only_in_whitespace(source, fix)
    {
        Category::Spacing
    } else {
        Category::Spelling
    };
    let confidence = if fix.is_empty() { FLAG_CONFIDENCE } else { FIX_CONFIDENCE };

    Some(GrammarError::new(span, source, fix, category, Origin::Basic, confidence))
}

fn differs_only_in_whitespace(source: &str, fix: &str) -> bool {
    if fix.is_empty() || source == fix {
        return false;
    }
    source.chars().filter(|c| !c.is_whitespace()).eq(fix.chars().filter(|c| !c.is_whitespace()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every chunk from a closure and records what it was sent.
    struct FakeService<F> {
        answer: F,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl<F> SpellService for FakeService<F>
    where
        F: Fn(&str) -> Result<Vec<SpellHit>> + Send + Sync,
    {
        async fn check_chunk(&self, chunk: &str) -> Result<Vec<SpellHit>> {
            self.seen.lock().push(chunk.to_string());
            (self.answer)(chunk)
        }
    }

    fn checker<F>(max: usize, answer: F) -> (BasicChecker, Arc<FakeService<F>>)
    where
        F: Fn(&str) -> Result<Vec<SpellHit>> + Send + Sync + 'static,
    {
        let service = Arc::new(FakeService {
            answer,
            seen: Mutex::new(Vec::new()),
        });
        (BasicChecker::new(service.clone(), max), service)
    }

    fn hit(offset: usize, length: usize, suggestion: Option<&str>) -> SpellHit {
        SpellHit {
            offset,
            length,
            suggestion: suggestion.map(str::to_string),
            kind: None,
        }
    }

    #[tokio::test]
    async fn single_chunk_hit() {
        let (checker, _) = checker(500, |_| Ok(vec![hit(0, 2, Some("안녕"))]));
        let findings = checker.check("안뇽 여러분").await.expect("ok");
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.source_text, "안뇽");
        assert_eq!(f.suggested_fix, "안녕");
        assert_eq!(f.category, Category::Spelling);
        assert_eq!(f.origin, Origin::Basic);
        assert!((f.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn hits_reoffset_across_chunks() {
        let text = "첫 문장. 둘째 문장. 셋째 문장.";
        // Every chunk reports its first two characters.
        let (checker, service) = checker(7, |_| Ok(vec![hit(0, 2, None)]));
        let findings = checker.check(text).await.expect("ok");

        let seen = service.seen.lock().clone();
        assert!(seen.len() > 1);
        assert_eq!(seen.concat(), text);
        assert_eq!(findings.len(), seen.len());

        let mut offset = 0;
        for (finding, chunk) in findings.iter().zip(&seen) {
            assert_eq!(finding.span.start(), offset);
            assert_eq!(finding.source_text, chunk.chars().take(2).collect::<String>());
            offset += chunk.chars().count();
        }
    }

    #[tokio::test]
    async fn flag_only_hits_have_lower_confidence() {
        let (checker, _) = checker(500, |_| Ok(vec![hit(0, 3, None)]));
        let findings = checker.check("됬었다 정말").await.expect("ok");
        assert!(findings[0].suggested_fix.is_empty());
        assert!((findings[0].confidence - 0.6).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn whitespace_only_fix_is_spacing() {
        let (checker, _) = checker(500, |_| Ok(vec![hit(0, 4, Some("할 수 있다"))]));
        let findings = checker.check("할수있다").await.expect("ok");
        assert_eq!(findings[0].category, Category::Spacing);
    }

    #[tokio::test]
    async fn tagged_spacing_is_spacing() {
        let (checker, _) = checker(500, |_| {
            Ok(vec![SpellHit {
                offset: 0,
                length: 2,
                suggestion: Some("안녕".into()),
                kind: Some("SPACING".into()),
            }])
        });
        let findings = checker.check("안뇽").await.expect("ok");
        assert_eq!(findings[0].category, Category::Spacing);
    }

    #[tokio::test]
    async fn invalid_hits_are_dropped_individually() {
        let (checker, _) = checker(500, |_| {
            Ok(vec![hit(0, 0, Some("x")), hit(3, 10, Some("x")), hit(0, 1, Some("가"))])
        });
        let findings = checker.check("나다라").await.expect("ok");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].suggested_fix, "가");
    }

    #[tokio::test(start_paused = true)]
    async fn service_failure_propagates() {
        let (checker, service) = checker(500, |_| Err(CheckError::RateLimited));
        let err = checker.check("글").await.expect_err("fails");
        assert!(matches!(err, CheckError::RateLimited));
        assert_eq!(service.seen.lock().len(), 2, "one retry, then give up");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_chunk_is_retried_once() {
        let calls = AtomicUsize::new(0);
        let (checker, service) = checker(500, move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CheckError::RateLimited)
            } else {
                Ok(vec![hit(0, 2, Some("안녕"))])
            }
        });
        let started = tokio::time::Instant::now();
        let findings = checker.check("안뇽 여러분").await.expect("retry succeeds");
        assert_eq!(findings.len(), 1);
        assert_eq!(service.seen.lock().len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(RATE_LIMIT_BACKOFF_MS));
    }

    #[tokio::test]
    async fn outage_is_not_retried() {
        let (checker, service) =
            checker(500, |_| Err(CheckError::ServiceUnavailable("HTTP 503".into())));
        checker.check("글").await.expect_err("fails");
        assert_eq!(service.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn empty_text_makes_no_calls() {
        let (checker, service) = checker(500, |_| Ok(vec![]));
        assert!(checker.check("").await.expect("ok").is_empty());
        assert!(service.seen.lock().is_empty());
    }

    #[test]
    fn wire_format_parses() {
        let body = r#"{"errors": [{"offset": 3, "length": 2, "suggestion": null}, {"offset": 0, "length": 1, "suggestion": "가", "kind": "spelling"}]}"#;
        let parsed: SpellResponse = serde_json::from_str(body).expect("parses");
        assert_eq!(parsed.errors.len(), 2);
        assert!(parsed.errors[0].suggestion.is_none());
    }
}
