//! Check orchestration: debounce, dual-checker fan-out, merge, delivery.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──edit──▶ Debouncing ──quiet period──▶ Checking ──both done──▶ Idle
//!                    ▲                            │
//!                    └──────── edit (Cancelled) ◀─┘
//! ```
//!
//! Every cycle gets a request id from a counter that only grows. A report
//! is delivered only if its id is still the latest one issued for the
//! current document, so a superseded cycle finishes its network calls and
//! is then discarded. Nothing is re-projected onto newer text.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use inkwell_core::config::CheckConfig;
use inkwell_core::journal::{ErrorLogSink, NullSink, UserAction};
use inkwell_core::span::char_len;
use inkwell_core::{CompositeError, GrammarError, Origin, merge};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::{AiChecker, AiGate};
use crate::basic::BasicChecker;
use crate::error::CheckError;

// ---------------------------------------------------------------------------
// External seams
// ---------------------------------------------------------------------------

/// Where the orchestrator reads the document from.
pub trait DocumentSource: Send + Sync {
    /// The full current text.
    fn current_text(&self) -> String;

    /// Surrounding context for the generative reviewer, if any.
    fn context(&self) -> Option<String> {
        None
    }
}

/// A fixed or externally updated in-memory document.
#[derive(Debug, Default)]
pub struct SharedText(Mutex<String>);

impl SharedText {
    /// Start with `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(Mutex::new(text.into()))
    }

    /// Replace the text. Callers still have to notify the orchestrator.
    pub fn set(&self, text: impl Into<String>) {
        *self.0.lock() = text.into();
    }
}

impl DocumentSource for SharedText {
    fn current_text(&self) -> String {
        self.0.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identity of the document a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// A fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    /// Nothing pending.
    Idle,
    /// Waiting for the writer to pause.
    Debouncing,
    /// Adapters are running.
    Checking,
    /// A running check was superseded by an edit.
    Cancelled,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Debouncing => "debouncing",
            Self::Checking => "checking",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// How much of the checking stack contributed to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coverage {
    /// Every enabled source answered.
    Full,
    /// One source failed; the list holds the other's findings.
    Partial {
        /// The source that failed.
        missing: Origin,
        /// Why it failed.
        reason: String,
    },
    /// Nothing answered. The list is empty; keep showing the previous batch.
    Failed {
        /// Why, per source.
        reason: String,
    },
}

impl Coverage {
    /// Whether the writer should see a degraded notice.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Full)
    }
}

/// One delivered batch of composite errors.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Request id of the cycle that produced it.
    pub request_id: u64,
    /// Document the cycle ran against.
    pub document: DocumentId,
    /// The exact text every span refers to.
    pub snapshot: Arc<str>,
    /// Merged errors, left to right.
    pub errors: Vec<CompositeError>,
    /// Which sources contributed.
    pub coverage: Coverage,
}

/// Timing and threshold settings.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Quiet period after the last edit.
    pub debounce: Duration,
    /// Hard cap on each adapter call.
    pub adapter_timeout: Duration,
    /// Trimmed texts shorter than this are not checked.
    pub min_text_chars: usize,
}

impl From<&CheckConfig> for OrchestratorSettings {
    fn from(config: &CheckConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            adapter_timeout: Duration::from_millis(config.adapter_timeout_ms),
            min_text_chars: config.min_text_chars,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&CheckConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct Session {
    document: DocumentId,
    source: Arc<dyn DocumentSource>,
    state: CheckState,
    latest_request: u64,
    edit_epoch: u64,
    debounce_task: Option<JoinHandle<()>>,
    journal: Arc<dyn ErrorLogSink>,
}

impl Session {
    fn transition(&mut self, to: CheckState) {
        if self.state != to {
            debug!(document = %self.document, from = %self.state, %to, "check state");
            self.state = to;
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(task) = self.debounce_task.take() {
            task.abort();
        }
    }
}

struct Inner {
    basic: BasicChecker,
    ai: Option<AiChecker>,
    gate: AiGate,
    settings: OrchestratorSettings,
    next_request: AtomicU64,
    session: Mutex<Session>,
    reports: mpsc::UnboundedSender<CheckReport>,
}

/// What one adapter contributed to a cycle.
enum Outcome {
    Found(Vec<GrammarError>),
    Failed(CheckError),
    /// AI disabled for the session.
    Skipped,
}

/// A snapshot ready to be checked.
struct Cycle {
    request_id: u64,
    document: DocumentId,
    snapshot: Arc<str>,
    context: Option<String>,
}

/// Drives checks for one document at a time and delivers [`CheckReport`]s.
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state())
            .field("latest_request", &self.latest_request_id())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator and the receiver its reports arrive on.
    ///
    /// `ai` of `None` runs Basic-only. `gate` should be the same gate the
    /// AI checker and the suggestion engine hold.
    #[must_use]
    pub fn new(
        settings: OrchestratorSettings,
        basic: BasicChecker,
        ai: Option<AiChecker>,
        gate: AiGate,
        source: Arc<dyn DocumentSource>,
    ) -> (Self, mpsc::UnboundedReceiver<CheckReport>) {
        let (reports, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            basic,
            ai,
            gate,
            settings,
            next_request: AtomicU64::new(1),
            session: Mutex::new(Session {
                document: DocumentId::new(),
                source,
                state: CheckState::Idle,
                latest_request: 0,
                edit_epoch: 0,
                debounce_task: None,
                journal: Arc::new(NullSink),
            }),
            reports,
        });
        (Self { inner }, rx)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CheckState {
        self.inner.session.lock().state
    }

    /// Current document.
    #[must_use]
    pub fn document(&self) -> DocumentId {
        self.inner.session.lock().document
    }

    /// The most recently issued request id (0 before the first cycle).
    #[must_use]
    pub fn latest_request_id(&self) -> u64 {
        self.inner.session.lock().latest_request
    }

    /// The writer edited the document: cancel any running check and
    /// restart the quiet period.
    pub fn text_changed(&self) {
        let mut session = self.inner.session.lock();
        if session.state == CheckState::Checking {
            session.latest_request = self.inner.issue_request_id();
            session.transition(CheckState::Cancelled);
        }
        session.cancel_pending();
        session.edit_epoch += 1;
        let epoch = session.edit_epoch;
        session.transition(CheckState::Debouncing);

        let inner = Arc::clone(&self.inner);
        session.debounce_task = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.settings.debounce).await;
            if let Some(cycle) = inner.begin_cycle(Some(epoch)) {
                inner.run_cycle(cycle).await;
            }
        }));
    }

    /// Check immediately, skipping the quiet period. Returns the request id.
    pub fn check_now(&self) -> u64 {
        {
            let mut session = self.inner.session.lock();
            session.cancel_pending();
            session.edit_epoch += 1;
        }
        let Some(cycle) = self.inner.begin_cycle(None) else {
            return self.latest_request_id();
        };
        let request_id = cycle.request_id;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_cycle(cycle).await });
        request_id
    }

    /// Journal every finding of each delivered report to `sink` as
    /// [`UserAction::Surfaced`]. Superseded cycles are not journaled.
    pub fn set_journal(&self, sink: Arc<dyn ErrorLogSink>) {
        self.inner.session.lock().journal = sink;
    }

    /// Start over on another document. Pending and in-flight work for the
    /// old one is discarded.
    pub fn switch_document(&self, source: Arc<dyn DocumentSource>) -> DocumentId {
        let mut session = self.inner.session.lock();
        session.cancel_pending();
        session.edit_epoch += 1;
        session.latest_request = self.inner.issue_request_id();
        session.document = DocumentId::new();
        session.source = source;
        session.transition(CheckState::Idle);
        info!(document = %session.document, "switched document");
        session.document
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.inner.session.lock().cancel_pending();
    }
}

impl Inner {
    fn issue_request_id(&self) -> u64 {
        self.next_request.fetch_add(1, Ordering::Relaxed)
    }

    /// Take the snapshot and issue its request id. `epoch` is the edit the
    /// debounce timer belongs to; a newer edit makes this a no-op.
    fn begin_cycle(&self, epoch: Option<u64>) -> Option<Cycle> {
        let mut session = self.session.lock();
        if epoch.is_some_and(|e| e != session.edit_epoch) {
            return None;
        }
        if epoch.is_some() {
            session.debounce_task = None;
        }
        let request_id = self.issue_request_id();
        session.latest_request = request_id;
        session.transition(CheckState::Checking);
        Some(Cycle {
            request_id,
            document: session.document,
            snapshot: Arc::from(session.source.current_text()),
            context: session.source.context(),
        })
    }

    async fn run_cycle(&self, cycle: Cycle) {
        let (report, findings) = if char_len(cycle.snapshot.trim()) < self.settings.min_text_chars.max(1) {
            debug!(request_id = cycle.request_id, "text below threshold, nothing to check");
            let report = CheckReport {
                request_id: cycle.request_id,
                document: cycle.document,
                snapshot: cycle.snapshot,
                errors: Vec::new(),
                coverage: Coverage::Full,
            };
            (report, Vec::new())
        } else {
            self.check_snapshot(cycle).await
        };
        self.deliver(report, &findings);
    }

    /// The report plus the per-source findings it was merged from.
    async fn check_snapshot(&self, cycle: Cycle) -> (CheckReport, Vec<GrammarError>) {
        let text: &str = &cycle.snapshot;
        let timeout = self.settings.adapter_timeout;

        let basic_fut = async {
            match tokio::time::timeout(timeout, self.basic.check(text)).await {
                Ok(Ok(found)) => Outcome::Found(found),
                Ok(Err(e)) => Outcome::Failed(e),
                Err(_) => Outcome::Failed(timed_out(timeout)),
            }
        };
        let ai_fut = async {
            let Some(ai) = self.ai.as_ref().filter(|_| self.gate.is_open()) else {
                return Outcome::Skipped;
            };
            match tokio::time::timeout(timeout, ai.check(text, cycle.context.as_deref())).await {
                Ok(Ok(found)) => Outcome::Found(found),
                Ok(Err(CheckError::AuthMissing)) => {
                    self.gate.close();
                    Outcome::Skipped
                }
                Ok(Err(e)) => Outcome::Failed(e),
                Err(_) => Outcome::Failed(timed_out(timeout)),
            }
        };
        let (basic, ai) = tokio::join!(basic_fut, ai_fut);

        let (basic_found, basic_err) = split(basic);
        let (ai_found, ai_err) = split(ai);
        let coverage = match (basic_err, ai_err) {
            (None, None) => Coverage::Full,
            (Some(reason), None) if ai_found.is_some() => Coverage::Partial {
                missing: Origin::Basic,
                reason,
            },
            (Some(reason), None) => Coverage::Failed { reason },
            (None, Some(reason)) => Coverage::Partial {
                missing: Origin::Ai,
                reason,
            },
            (Some(basic), Some(ai)) => Coverage::Failed {
                reason: format!("basic: {basic}; ai: {ai}"),
            },
        };
        match &coverage {
            Coverage::Full => {}
            Coverage::Partial { missing, reason } => {
                warn!(request_id = cycle.request_id, %missing, %reason, "partial check");
            }
            Coverage::Failed { reason } => {
                warn!(request_id = cycle.request_id, %reason, "check failed");
            }
        }

        let basic_found = basic_found.unwrap_or_default();
        let ai_found = ai_found.unwrap_or_default();
        let errors = if matches!(coverage, Coverage::Failed { .. }) {
            Vec::new()
        } else {
            merge(&basic_found, &ai_found)
        };
        let mut findings = basic_found;
        findings.extend(ai_found);

        let report = CheckReport {
            request_id: cycle.request_id,
            document: cycle.document,
            snapshot: cycle.snapshot.clone(),
            errors,
            coverage,
        };
        (report, findings)
    }

    fn deliver(&self, report: CheckReport, findings: &[GrammarError]) {
        let journal = {
            let mut session = self.session.lock();
            if report.request_id != session.latest_request || report.document != session.document {
                debug!(
                    request_id = report.request_id,
                    latest = session.latest_request,
                    "discarding stale check report"
                );
                return;
            }
            session.transition(CheckState::Idle);
            info!(
                request_id = report.request_id,
                errors = report.errors.len(),
                degraded = report.coverage.is_degraded(),
                "check report ready"
            );
            if self.reports.send(report).is_err() {
                debug!("report receiver dropped");
            }
            Arc::clone(&session.journal)
        };
        // The sink may block on I/O, so it runs outside the session lock.
        for finding in findings {
            journal.record(finding, UserAction::Surfaced);
        }
    }
}

fn split(outcome: Outcome) -> (Option<Vec<GrammarError>>, Option<String>) {
    match outcome {
        Outcome::Found(found) => (Some(found), None),
        Outcome::Failed(e) => (None, Some(e.to_string())),
        Outcome::Skipped => (None, None),
    }
}

fn timed_out(timeout: Duration) -> CheckError {
    CheckError::ServiceUnavailable(format!("timed out after {}ms", timeout.as_millis()))
}
