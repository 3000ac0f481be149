//! Error journal: optional SQLite log of findings and what the writer did
//! with them, collected as future learning data.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS grammar_log (
//!     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//!     source_text   TEXT NOT NULL,
//!     suggested_fix TEXT NOT NULL,
//!     category      TEXT NOT NULL,
//!     origin        TEXT NOT NULL,
//!     confidence    REAL NOT NULL,
//!     user_action   TEXT NOT NULL,
//!     rationale     TEXT,
//!     recorded_at   TEXT NOT NULL
//! );
//! ```
//!
//! Recording is fire-and-forget: [`ErrorLogSink::record`] never returns an
//! error and never blocks a check cycle. Use [`BackgroundJournal`] to move
//! the SQLite writes onto a dedicated thread.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::JournalConfig;
use crate::error::{InkwellError, Result};
use crate::span::{Category, GrammarError, Origin};

/// What the writer did with a surfaced finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAction {
    /// The fix was applied.
    Accepted,
    /// The writer dismissed the finding.
    Rejected,
    /// The finding was superseded without interaction.
    Ignored,
    /// The finding was shown to the writer.
    Surfaced,
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Ignored => "ignored",
            Self::Surfaced => "surfaced",
        };
        write!(f, "{name}")
    }
}

impl FromStr for UserAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "ignored" => Ok(Self::Ignored),
            "surfaced" => Ok(Self::Surfaced),
            _ => Err(format!("unknown user action: '{s}'")),
        }
    }
}

/// One journaled finding.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Text the finding covered.
    pub source_text: String,
    /// Proposed fix (possibly empty).
    pub suggested_fix: String,
    /// Finding category.
    pub category: Category,
    /// Reporting checker.
    pub origin: Origin,
    /// Reported confidence.
    pub confidence: f32,
    /// What the writer did.
    pub user_action: UserAction,
    /// Explanation, if any.
    pub rationale: Option<String>,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Capture a finding and the writer's action, stamped now.
    #[must_use]
    pub fn new(error: &GrammarError, user_action: UserAction) -> Self {
        Self {
            source_text: error.source_text.clone(),
            suggested_fix: error.suggested_fix.clone(),
            category: error.category,
            origin: error.origin,
            confidence: error.confidence,
            user_action,
            rationale: error.rationale.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Destination for journaled findings.
pub trait ErrorLogSink: Send + Sync {
    /// Record a finding and the writer's action. Failures are dropped.
    fn record(&self, error: &GrammarError, action: UserAction);
}

/// Sink that discards everything (journal disabled).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ErrorLogSink for NullSink {
    fn record(&self, _error: &GrammarError, _action: UserAction) {}
}

// ---------------------------------------------------------------------------
// ErrorJournal
// ---------------------------------------------------------------------------

/// Handle to an open SQLite journal.
pub struct ErrorJournal {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl fmt::Debug for ErrorJournal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorJournal")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl ErrorJournal {
    /// Open (or create) the journal database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InkwellError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &JournalConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        Self::create_schema(&conn)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "error journal opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Open an in-memory journal (tests, throwaway sessions).
    ///
    /// # Errors
    ///
    /// Returns [`InkwellError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS grammar_log (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                source_text   TEXT NOT NULL,
                suggested_fix TEXT NOT NULL,
                category      TEXT NOT NULL,
                origin        TEXT NOT NULL,
                confidence    REAL NOT NULL,
                user_action   TEXT NOT NULL,
                rationale     TEXT,
                recorded_at   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_grammar_log_action ON grammar_log (user_action);",
        )?;
        Ok(())
    }

    /// Path the journal was opened at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Insert one entry.
    ///
    /// # Errors
    ///
    /// Returns [`InkwellError::Database`] on SQLite failures.
    pub fn record_entry(&self, entry: &JournalEntry) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO grammar_log
                (source_text, suggested_fix, category, origin, confidence, user_action, rationale, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.source_text,
                entry.suggested_fix,
                entry.category.to_string(),
                entry.origin.to_string(),
                f64::from(entry.confidence),
                entry.user_action.to_string(),
                entry.rationale,
                entry.recorded_at.to_rfc3339(),
            ],
        )?;
        debug!(action = %entry.user_action, category = %entry.category, "journaled finding");
        Ok(())
    }

    /// Most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`InkwellError::Database`] on SQLite failures and
    /// [`InkwellError::Serialization`] for rows that no longer parse.
    pub fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT source_text, suggested_fix, category, origin, confidence, user_action, rationale, recorded_at
             FROM grammar_log ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (source_text, suggested_fix, category, origin, confidence, action, rationale, at) = row?;
            #[allow(clippy::cast_possible_truncation)]
            let confidence = confidence as f32;
            entries.push(JournalEntry {
                source_text,
                suggested_fix,
                category: category.parse().map_err(InkwellError::Serialization)?,
                origin: origin.parse().map_err(InkwellError::Serialization)?,
                confidence,
                user_action: action.parse().map_err(InkwellError::Serialization)?,
                rationale,
                recorded_at: DateTime::parse_from_rfc3339(&at)
                    .map_err(|e| InkwellError::Serialization(e.to_string()))?
                    .with_timezone(&Utc),
            });
        }
        Ok(entries)
    }

    /// Number of entries recorded with `action`.
    ///
    /// # Errors
    ///
    /// Returns [`InkwellError::Database`] on SQLite failures.
    pub fn count_by_action(&self, action: UserAction) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM grammar_log WHERE user_action = ?1",
            params![action.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl ErrorLogSink for ErrorJournal {
    fn record(&self, error: &GrammarError, action: UserAction) {
        if let Err(e) = self.record_entry(&JournalEntry::new(error, action)) {
            debug!(error = %e, "dropping journal entry");
        }
    }
}

// ---------------------------------------------------------------------------
// BackgroundJournal
// ---------------------------------------------------------------------------

/// Sink that hands entries to a writer thread owning an [`ErrorJournal`].
///
/// `record` only pushes onto an unbounded channel. Dropping the sink closes
/// the channel and waits for the writer to drain what was already queued.
#[derive(Debug)]
pub struct BackgroundJournal {
    tx: Option<mpsc::UnboundedSender<JournalEntry>>,
    writer: Option<JoinHandle<()>>,
}

impl BackgroundJournal {
    /// Spawn the writer thread.
    ///
    /// # Errors
    ///
    /// Returns [`InkwellError::Io`] if the thread cannot be spawned.
    pub fn spawn(journal: ErrorJournal) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<JournalEntry>();
        let writer = std::thread::Builder::new()
            .name("inkwell-journal".into())
            .spawn(move || {
                while let Some(entry) = rx.blocking_recv() {
                    if let Err(e) = journal.record_entry(&entry) {
                        warn!(error = %e, "journal write failed");
                    }
                }
                debug!("journal writer stopped");
            })?;
        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    /// Close the channel and wait for queued entries to be written.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for BackgroundJournal {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!("journal writer panicked");
            }
        }
    }
}

impl ErrorLogSink for BackgroundJournal {
    fn record(&self, error: &GrammarError, action: UserAction) {
        // A closed channel means the writer is gone; the entry is dropped.
        if let Some(tx) = &self.tx {
            let _ = tx.send(JournalEntry::new(error, action));
        }
    }
}
