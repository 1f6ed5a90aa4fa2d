//! Data types for indexed documents, units, and match results.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::language::Language;

/// Fixed-shape metadata recorded once per indexed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// The original filename or label of the upload.
    pub label: String,
    /// The language the document was written in.
    pub language: Language,
    /// Whether the stored unit texts were translated to English before embedding.
    pub units_translated: bool,
}

impl DocumentMetadata {
    /// The language of the stored unit texts.
    pub fn unit_language(&self) -> Language {
        if self.units_translated { Language::English } else { self.language }
    }
}

/// The atomic indexed span of a [`IndexedDocument`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    /// The ID of the parent document.
    pub document_id: String,
    /// 0-based position within the parent's ordered unit sequence.
    pub position: usize,
    /// The unit text.
    pub text: String,
    /// The vector embedding for this unit's text.
    pub embedding: Vec<f32>,
}

/// A document with its full, ordered unit set.
///
/// Documents are immutable once built; re-indexing replaces the whole value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    /// Unique identifier for the document.
    pub id: String,
    /// The decoded source text.
    pub text: String,
    /// Label and language metadata.
    pub metadata: DocumentMetadata,
    /// Units in document order.
    pub units: Vec<Unit>,
}

impl IndexedDocument {
    /// Assemble a document from parallel unit texts and embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the two sequences differ in
    /// length, and [`RagError::DimensionMismatch`] if the embeddings do not
    /// all share one dimensionality.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: DocumentMetadata,
        unit_texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let id = id.into();
        if unit_texts.len() != embeddings.len() {
            return Err(RagError::PipelineError(format!(
                "document '{id}' has {} units but {} embeddings",
                unit_texts.len(),
                embeddings.len()
            )));
        }
        if let Some(first) = embeddings.first() {
            let expected = first.len();
            if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
                return Err(RagError::DimensionMismatch { expected, actual: bad.len() });
            }
        }

        let units = unit_texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (text, embedding))| Unit {
                document_id: id.clone(),
                position,
                text,
                embedding,
            })
            .collect();

        Ok(Self { id, text: text.into(), metadata, units })
    }

    /// Embedding dimensionality, or `None` for a document with no units.
    pub fn dimensions(&self) -> Option<usize> {
        self.units.first().map(|u| u.embedding.len())
    }

    /// Unit texts in document order.
    pub fn unit_texts(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.text.as_str()).collect()
    }

    /// Build the presentation summary with a preview of at most `preview_chars` characters.
    pub fn summary(&self, preview_chars: usize) -> DocumentSummary {
        let trimmed = self.text.trim();
        let mut preview: String = trimmed.chars().take(preview_chars).collect();
        if trimmed.chars().nth(preview_chars).is_some() {
            preview.push('…');
        }
        DocumentSummary {
            id: self.id.clone(),
            label: self.metadata.label.clone(),
            language: self.metadata.language,
            unit_count: self.units.len(),
            preview,
        }
    }
}

/// One row of [`RetrievalIndex::list`](crate::RetrievalIndex::list).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    /// Document identifier.
    pub id: String,
    /// Filename or label.
    pub label: String,
    /// Source language.
    pub language: Language,
    /// Number of indexed units.
    pub unit_count: usize,
    /// Bounded prefix of the document text.
    pub preview: String,
}

/// A retrieved [`Unit`] paired with its cosine similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitHit {
    /// The retrieved unit.
    pub unit: Unit,
    /// Metadata of the unit's parent document.
    pub metadata: DocumentMetadata,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The outcome of a successful [`answer_query`](crate::RetrievalEngine::answer_query).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The best-matching document.
    pub document_id: String,
    /// Filename or label of that document.
    pub label: String,
    /// Source language of that document.
    pub language: Language,
    /// The context window rendered in English.
    pub passage: String,
    /// The context window as stored, before query-time translation.
    pub source_passage: String,
    /// Position of the best unit within its document.
    pub position: usize,
    /// Half-open unit range `[start, end)` covered by the window.
    pub window: (usize, usize),
    /// Boosted relevance score; may exceed 1.0.
    pub score: f32,
}

impl Answer {
    /// The score rounded to three decimal places for display.
    pub fn display_score(&self) -> String {
        format!("{:.3}", self.score)
    }
}

/// Result of [`index_document`](crate::RetrievalEngine::index_document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Identifier the document was stored under.
    pub document_id: String,
    /// Resolved source language.
    pub language: Language,
    /// Number of units indexed; zero means nothing was stored.
    pub unit_count: usize,
}
