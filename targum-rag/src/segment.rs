//! Document segmentation into indexable units.
//!
//! [`SegmentMode`] picks the unit granularity:
//!
//! - [`SegmentMode::Paragraph`]: splits on blank lines, trimming each piece
//! - [`SegmentMode::Sentence`]: splits after `.`, `!` or `?` followed by whitespace
//! - [`SegmentMode::Whole`]: the whole trimmed document is a single unit

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One or more blank lines (lines holding only whitespace count as blank).
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

/// A sentence terminator followed by the whitespace that separates it from the next sentence.
static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence pattern is valid"));

/// Unit granularity used when indexing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMode {
    /// Blank-line separated paragraphs.
    #[default]
    Paragraph,
    /// Punctuation-terminated sentences.
    Sentence,
    /// One unit per document.
    Whole,
}

impl SegmentMode {
    /// Split `text` into ordered unit texts.
    ///
    /// Returns an empty `Vec` for empty or whitespace-only text.
    pub fn segment(self, text: &str) -> Vec<String> {
        match self {
            SegmentMode::Paragraph => split_paragraphs(text),
            SegmentMode::Sentence => split_sentences(text),
            SegmentMode::Whole => {
                let trimmed = text.trim();
                if trimmed.is_empty() { Vec::new() } else { vec![trimmed.to_string()] }
            }
        }
    }
}

/// Split `text` into ordered unit texts using `mode`.
pub fn segment(text: &str, mode: SegmentMode) -> Vec<String> {
    mode.segment(text)
}

fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split after each terminator, keeping it attached to the preceding sentence
/// and dropping the separating whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK.find_iter(text) {
        // Terminators are single-byte ASCII.
        let end = m.start() + 1;
        push_sentence(&mut sentences, &text[start..end]);
        start = m.end();
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, piece: &str) {
    if !piece.trim().is_empty() {
        sentences.push(piece.to_string());
    }
}
