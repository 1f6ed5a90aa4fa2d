//! Relevance scoring: cosine similarity plus a binary lexical boost.
//!
//! Boosted scores are compared only with each other and with the rejection
//! threshold. They are not clamped and may exceed 1.0.

use crate::document::IndexedDocument;

/// Default lexical boost added when any query word appears in a candidate.
pub const DEFAULT_KEYWORD_BOOST: f32 = 0.2;

/// Default rejection threshold; best scores strictly below it are discarded.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.3;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Whether any whitespace-delimited word of `query` occurs inside `candidate`.
///
/// Matching is case-insensitive substring containment, so a query word inside
/// a longer candidate word counts.
pub fn has_keyword_overlap(query: &str, candidate: &str) -> bool {
    let candidate = candidate.to_lowercase();
    query.to_lowercase().split_whitespace().any(|word| candidate.contains(word))
}

/// Whether a best score clears the rejection threshold.
pub fn meets_threshold(score: f32, threshold: f32) -> bool {
    score >= threshold
}

/// The best unit found by [`RelevanceScorer::best_match`].
#[derive(Debug, Clone, Copy)]
pub struct ScoredUnit<'a> {
    /// The document the unit belongs to.
    pub document: &'a IndexedDocument,
    /// Position of the unit within the document.
    pub position: usize,
    /// Boosted score.
    pub score: f32,
}

/// Blends vector similarity with a lexical-overlap boost.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    keyword_boost: f32,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORD_BOOST)
    }
}

impl RelevanceScorer {
    /// Create a scorer with the given boost increment.
    pub fn new(keyword_boost: f32) -> Self {
        Self { keyword_boost }
    }

    /// Score one candidate unit against a query.
    pub fn score(
        &self,
        query_text: &str,
        query_vector: &[f32],
        candidate_text: &str,
        candidate_vector: &[f32],
    ) -> f32 {
        let similarity = cosine_similarity(query_vector, candidate_vector);
        if has_keyword_overlap(query_text, candidate_text) {
            similarity + self.keyword_boost
        } else {
            similarity
        }
    }

    /// The highest-scoring unit of one document; the first unit wins ties.
    pub fn best_in_document<'a>(
        &self,
        query_text: &str,
        query_vector: &[f32],
        document: &'a IndexedDocument,
    ) -> Option<ScoredUnit<'a>> {
        let mut best: Option<ScoredUnit<'a>> = None;
        for unit in &document.units {
            let score = self.score(query_text, query_vector, &unit.text, &unit.embedding);
            if score.is_nan() {
                continue;
            }
            if best.is_none_or(|b| score > b.score) {
                best = Some(ScoredUnit { document, position: unit.position, score });
            }
        }
        best
    }

    /// The globally best unit across `documents`; the first document wins ties.
    pub fn best_match<'a, I>(
        &self,
        query_text: &str,
        query_vector: &[f32],
        documents: I,
    ) -> Option<ScoredUnit<'a>>
    where
        I: IntoIterator<Item = &'a IndexedDocument>,
    {
        let mut best: Option<ScoredUnit<'a>> = None;
        for document in documents {
            let Some(candidate) = self.best_in_document(query_text, query_vector, document) else {
                continue;
            };
            if best.is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }
}
