//! Core type definitions shared by every checker and the merge engine.
//!
//! All offsets are character offsets into the document text the finding was
//! computed against. A span is only meaningful for that exact snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InkwellError, Result};

// ---------------------------------------------------------------------------
// Character-offset helpers
// ---------------------------------------------------------------------------

/// Number of characters (not bytes) in `text`.
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the character at `char_idx`, or `text.len()` when
/// `char_idx` equals the character length. `None` past the end.
#[must_use]
pub fn byte_index(text: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte, _) in text.char_indices() {
        if count == char_idx {
            return Some(byte);
        }
        count += 1;
    }
    (count == char_idx).then_some(text.len())
}

/// Substring of `text` between two character offsets.
#[must_use]
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let from = byte_index(text, start)?;
    let to = byte_index(text, end)?;
    text.get(from..to)
}

/// The last `max_chars` characters of `text` (all of it when shorter).
#[must_use]
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let len = char_len(text);
    if len <= max_chars {
        return text;
    }
    byte_index(text, len - max_chars).map_or(text, |from| &text[from..])
}

/// Character offsets of every non-overlapping occurrence of `needle`.
#[must_use]
pub fn find_char_offsets(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    let mut offsets = Vec::new();
    let mut chars_seen = 0;
    let mut bytes_seen = 0;
    for (byte, _) in haystack.match_indices(needle) {
        chars_seen += char_len(&haystack[bytes_seen..byte]);
        bytes_seen = byte;
        offsets.push(chars_seen);
    }
    offsets
}

// ---------------------------------------------------------------------------
// TextSpan
// ---------------------------------------------------------------------------

/// Half-open character range `[start, end)` with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    start: usize,
    end: usize,
}

impl TextSpan {
    /// Create a span; `None` when `end <= start`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Create a span that must also fit inside `text`.
    ///
    /// # Errors
    /// Returns [`InkwellError::InvalidSpan`] unless `start < end <= char_len(text)`.
    pub fn within(start: usize, end: usize, text: &str) -> Result<Self> {
        let len = char_len(text);
        match Self::new(start, end) {
            Some(span) if end <= len => Ok(span),
            _ => Err(InkwellError::InvalidSpan { start, end, len }),
        }
    }

    /// Inclusive start offset.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Exclusive end offset.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Length in characters (always at least 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Spans are never empty; present for clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `a.start < b.end && b.start < a.end`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely inside this span.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both ends right by `delta` characters (chunk → document coordinates).
    #[must_use]
    pub fn offset_by(&self, delta: usize) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// The text this span covers, or `None` if it runs past the end.
    #[must_use]
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        char_slice(text, self.start, self.end)
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Category / Origin
// ---------------------------------------------------------------------------

/// Kind of problem a finding reports.
///
/// Declaration order is merge priority: when categories tie on votes the
/// earlier variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Misspelled word.
    Spelling,
    /// Word spacing.
    Spacing,
    /// Grammatical construction.
    Grammar,
    /// Awkward or unidiomatic expression.
    Style,
    /// Anything the source could not classify.
    Unknown,
}

impl Category {
    /// Every category, in priority order.
    pub const ALL: [Category; 5] = [
        Self::Spelling,
        Self::Spacing,
        Self::Grammar,
        Self::Style,
        Self::Unknown,
    ];

    /// Human-readable name shown next to a correction.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Spelling => "spelling error",
            Self::Spacing => "spacing error",
            Self::Grammar => "grammar error",
            Self::Style => "awkward expression",
            Self::Unknown => "other",
        }
    }

    /// Lenient mapping from a model- or service-supplied tag.
    ///
    /// Accepts English and Korean tags, case-insensitively. Unrecognised
    /// tags map to [`Category::Unknown`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        let tag = tag.trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')'));
        if tag.contains("spell") || tag.contains("맞춤법") || tag.contains("철자") {
            Self::Spelling
        } else if tag.contains("spac") || tag.contains("띄어쓰기") {
            Self::Spacing
        } else if tag.contains("grammar") || tag.contains("문법") {
            Self::Grammar
        } else if tag.contains("style")
            || tag.contains("express")
            || tag.contains("logic")
            || tag.contains("표현")
            || tag.contains("논리")
        {
            Self::Style
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Spelling => "spelling",
            Self::Spacing => "spacing",
            Self::Grammar => "grammar",
            Self::Style => "style",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "spelling" => Ok(Self::Spelling),
            "spacing" => Ok(Self::Spacing),
            "grammar" => Ok(Self::Grammar),
            "style" => Ok(Self::Style),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown category: '{s}'")),
        }
    }
}

/// Which checker produced a finding.
///
/// `Basic` sorts first; it is the deterministic source and wins ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Rule/dictionary-based spell-check service.
    Basic,
    /// Generative-model grammar reviewer.
    Ai,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "ai" => Ok(Self::Ai),
            _ => Err(format!("unknown origin: '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// GrammarError
// ---------------------------------------------------------------------------

/// One finding from one checker, anchored to a document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarError {
    /// Where the finding applies.
    pub span: TextSpan,
    /// The document text at `span`.
    pub source_text: String,
    /// Proposed replacement; empty when the source only flags the text.
    pub suggested_fix: String,
    /// Kind of problem.
    pub category: Category,
    /// Which checker reported it.
    pub origin: Origin,
    /// Source confidence in `[0, 1]`.
    pub confidence: f32,
    /// Optional explanation, including anchoring caveats.
    pub rationale: Option<String>,
}

impl GrammarError {
    /// Build a finding. Confidence is clamped to `[0, 1]`; NaN becomes 0.
    #[must_use]
    pub fn new(
        span: TextSpan,
        source_text: impl Into<String>,
        suggested_fix: impl Into<String>,
        category: Category,
        origin: Origin,
        confidence: f32,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            span,
            source_text: source_text.into(),
            suggested_fix: suggested_fix.into(),
            category,
            origin,
            confidence,
            rationale: None,
        }
    }

    /// Build a finding whose `source_text` is sliced out of `text`.
    ///
    /// Returns `None` if the span does not fit the text.
    #[must_use]
    pub fn at(
        text: &str,
        span: TextSpan,
        suggested_fix: impl Into<String>,
        category: Category,
        origin: Origin,
        confidence: f32,
    ) -> Option<Self> {
        let source = span.slice(text)?;
        Some(Self::new(span, source, suggested_fix, category, origin, confidence))
    }

    /// Attach an explanation.
    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// A finding whose fix would not change the text.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.suggested_fix == self.source_text
    }

    /// Whether the finding carries an actual replacement.
    #[must_use]
    pub fn has_fix(&self) -> bool {
        !self.suggested_fix.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CompositeError
// ---------------------------------------------------------------------------

/// The unit surfaced to the writer: one per maximal overlapping group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeError {
    /// Union of every contributing span.
    pub span: TextSpan,
    /// Preferred replacement (empty if nobody proposed one).
    pub primary_fix: String,
    /// Other distinct replacements, most confident first.
    pub alternative_fixes: Vec<String>,
    /// Majority category of the group.
    pub category: Category,
    /// Checkers that contributed.
    pub contributing_origins: BTreeSet<Origin>,
}

impl CompositeError {
    /// The covered text in the snapshot the error was computed from.
    #[must_use]
    pub fn source_text<'a>(&self, snapshot: &'a str) -> Option<&'a str> {
        self.span.slice(snapshot)
    }

    /// Whether both checkers agreed something is wrong here.
    #[must_use]
    pub fn is_corroborated(&self) -> bool {
        self.contributing_origins.len() > 1
    }
}

// ---------------------------------------------------------------------------
// SuggestionCandidate
// ---------------------------------------------------------------------------

/// A proposed continuation sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCandidate {
    /// The sentence, trimmed.
    pub text: String,
    /// Position in the service's own ranking (0 = best).
    pub rank: usize,
    /// Optional note on the direction the sentence takes.
    pub rationale: Option<String>,
}
