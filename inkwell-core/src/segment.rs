//! Sentence-boundary segmentation for length-limited check services.
//!
//! A spell-check service that accepts at most `max_chars` characters per
//! request gets the document in consecutive, non-overlapping chunks. Each
//! chunk ends at the last sentence boundary inside its window; when the
//! window holds no boundary it is cut at exactly `max_chars`.

/// One request-sized piece of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Character offset of the chunk's first character in the document.
    pub char_offset: usize,
    /// The chunk text.
    pub text: String,
}

/// Characters that end a sentence.
const SENTENCE_TERMINATORS: [char; 7] = ['.', '!', '?', '。', '…', '\n', '？'];

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Concatenating the chunk texts reproduces `text` exactly. `max_chars` of
/// zero is treated as one.
#[must_use]
pub fn segment(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let window_end = (pos + max_chars).min(chars.len());
        let end = if window_end == chars.len() {
            window_end
        } else {
            last_boundary(&chars, pos, window_end).unwrap_or(window_end)
        };
        chunks.push(Chunk {
            char_offset: pos,
            text: chars[pos..end].iter().collect(),
        });
        pos = end;
    }
    chunks
}

/// End offset (exclusive) of the last sentence inside `chars[from..to]`,
/// including whitespace that follows the terminator inside the window.
fn last_boundary(chars: &[char], from: usize, to: usize) -> Option<usize> {
    let terminator = (from..to).rev().find(|&i| SENTENCE_TERMINATORS.contains(&chars[i]))?;
    let mut end = terminator + 1;
    while end < to && chars[end].is_whitespace() {
        end += 1;
    }
    Some(end)
}

/// Split text into trimmed, non-empty sentences.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(|c: char| SENTENCE_TERMINATORS.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejoin(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = segment("안녕하세요.", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].char_offset, 0);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(segment("", 10).is_empty());
    }

    #[test]
    fn cuts_after_sentence_terminator_and_space() {
        let text = "첫 문장입니다. 두 번째 문장입니다.";
        let chunks = segment(text, 12);
        assert_eq!(chunks[0].text, "첫 문장입니다. ");
        assert_eq!(chunks[1].char_offset, 9);
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn falls_back_to_hard_cut_without_boundary() {
        let text = "가".repeat(25);
        let chunks = segment(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].char_offset, 10);
        assert_eq!(chunks[2].text.chars().count(), 5);
    }

    #[test]
    fn offsets_are_cumulative_character_counts() {
        let text = "하나. 둘. 셋. 넷. 다섯.";
        let chunks = segment(text, 5);
        let mut expected = 0;
        for chunk in &chunks {
            assert_eq!(chunk.char_offset, expected);
            assert!(chunk.text.chars().count() <= 5);
            expected += chunk.text.chars().count();
        }
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn split_sentences_trims_pieces() {
        assert_eq!(
            split_sentences("좋아요. 정말요?  네!\n"),
            vec!["좋아요.", "정말요?", "네!"]
        );
        assert!(split_sentences("   ").is_empty());
    }
}
