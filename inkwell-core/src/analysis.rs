//! Rule-based writing analysis that needs no external service.
//!
//! Used as tips next to the editor and as the fallback summary when the
//! generative logic review is unavailable.

use crate::segment::split_sentences;
use crate::span::char_len;

/// Texts shorter than this get the "add detail" tip.
const SHORT_TEXT_CHARS: usize = 50;
/// Sentence count above which average length is considered.
const LONG_TEXT_SENTENCES: usize = 5;
/// Average sentence length (chars) above which splitting is suggested.
const LONG_SENTENCE_CHARS: f64 = 100.0;

/// A rule-based writing tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingTip {
    /// The text is very short.
    AddDetail,
    /// Sentences are long on average.
    SplitLongSentences,
    /// Nothing to flag.
    KeepGoing,
}

impl WritingTip {
    /// Message shown to the writer.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::AddDetail => "Try adding more concrete detail.",
            Self::SplitLongSentences => {
                "Your sentences may be too long. Consider splitting them up."
            }
            Self::KeepGoing => "Looking good. Keep writing!",
        }
    }
}

/// Sentence statistics for a text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentenceStats {
    /// Number of non-empty sentences.
    pub count: usize,
    /// Mean sentence length in characters (0 when there are none).
    pub average_chars: f64,
}

/// Count sentences and their mean length.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sentence_stats(text: &str) -> SentenceStats {
    let sentences = split_sentences(text);
    let count = sentences.len();
    let total: usize = sentences.iter().map(|s| char_len(s)).sum();
    let average_chars = if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    };
    SentenceStats {
        count,
        average_chars,
    }
}

/// Number of non-empty sentences in `text`.
#[must_use]
pub fn sentence_count(text: &str) -> usize {
    split_sentences(text).len()
}

/// Tips for the current text, never empty.
#[must_use]
pub fn writing_tips(text: &str) -> Vec<WritingTip> {
    let mut tips = Vec::new();

    if char_len(text.trim()) < SHORT_TEXT_CHARS {
        tips.push(WritingTip::AddDetail);
    }

    let stats = sentence_stats(text);
    if stats.count > LONG_TEXT_SENTENCES && stats.average_chars > LONG_SENTENCE_CHARS {
        tips.push(WritingTip::SplitLongSentences);
    }

    if tips.is_empty() {
        tips.push(WritingTip::KeepGoing);
    }
    tips
}

/// One-line summary used when no generative review is available.
#[must_use]
pub fn basic_summary(text: &str) -> String {
    format!("The text has {} sentence(s).", sentence_count(text))
}
