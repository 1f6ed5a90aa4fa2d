//! Retrieval index trait and the immutable document set it publishes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{DocumentSummary, IndexedDocument, UnitHit};
use crate::error::{RagError, Result};
use crate::scoring::cosine_similarity;

/// Default number of characters shown in a [`DocumentSummary`] preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 50;

/// A storage backend holding indexed documents with nearest-neighbour search.
///
/// Implementations publish whole [`DocumentSet`] snapshots: a reader sees
/// either the state before a mutation or the state after it, never a
/// document with only part of its units. Mutations are serialized.
///
/// # Example
///
/// ```rust,ignore
/// use targum_rag::{InMemoryIndex, RetrievalIndex};
///
/// let index = InMemoryIndex::new();
/// index.add(document).await?;
/// let hits = index.query(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// A short name used in logs and errors.
    fn backend(&self) -> &str;

    /// Insert a document, atomically replacing any document with the same ID.
    async fn add(&self, document: IndexedDocument) -> Result<()>;

    /// Remove a document and all its units. Unknown IDs are a no-op.
    async fn delete(&self, document_id: &str) -> Result<()>;

    /// One summary per indexed document, in index order.
    async fn list(&self) -> Result<Vec<DocumentSummary>>;

    /// The `top_k` units nearest to `embedding` across all documents.
    ///
    /// Returns results ordered by descending cosine similarity; an empty
    /// index yields an empty `Vec`.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<UnitHit>>;

    /// A consistent view of every fully indexed document.
    async fn snapshot(&self) -> Result<Arc<DocumentSet>>;

    /// Remove every document.
    async fn clear(&self) -> Result<()>;
}

/// An immutable, ordered collection of indexed documents.
///
/// Mutating methods return a new set; the backends swap it in whole.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    dimensions: Option<usize>,
    documents: Vec<Arc<IndexedDocument>>,
}

impl DocumentSet {
    /// Create an empty set, optionally locked to a dimensionality.
    pub fn new(dimensions: Option<usize>) -> Self {
        Self { dimensions, documents: Vec::new() }
    }

    pub(crate) fn from_documents(
        dimensions: Option<usize>,
        documents: Vec<IndexedDocument>,
    ) -> Result<Self> {
        documents.into_iter().try_fold(Self::new(dimensions), |set, doc| set.with_document(doc))
    }

    /// Embedding dimensionality of the set, once known.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the set holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in index order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexedDocument> {
        self.documents.iter().map(|d| &**d)
    }

    /// Look up a document by ID.
    pub fn get(&self, document_id: &str) -> Option<&IndexedDocument> {
        self.iter().find(|d| d.id == document_id)
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != actual => {
                Err(RagError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    /// A copy with `document` appended and any previous version removed.
    pub fn with_document(&self, document: IndexedDocument) -> Result<Self> {
        let mut dimensions = self.dimensions;
        if let Some(actual) = document.dimensions() {
            self.check_dimensions(actual)?;
            dimensions = Some(actual);
        }

        let mut documents: Vec<Arc<IndexedDocument>> =
            self.documents.iter().filter(|d| d.id != document.id).cloned().collect();
        documents.push(Arc::new(document));
        Ok(Self { dimensions, documents })
    }

    /// A copy without `document_id`, or `None` when it is not present.
    pub fn without_document(&self, document_id: &str) -> Option<Self> {
        if self.get(document_id).is_none() {
            return None;
        }
        let documents = self.documents.iter().filter(|d| d.id != document_id).cloned().collect();
        Some(Self { dimensions: self.dimensions, documents })
    }

    /// An empty set that keeps this set's dimensionality.
    pub fn cleared(&self) -> Self {
        Self::new(self.dimensions)
    }

    /// Rank every unit by cosine similarity and keep the best `top_k`.
    ///
    /// Equal scores keep index order. A NaN score ranks below every number.
    pub fn nearest(&self, embedding: &[f32], top_k: usize) -> Result<Vec<UnitHit>> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimensions(embedding.len())?;

        let mut scored: Vec<UnitHit> = self
            .iter()
            .flat_map(|doc| {
                doc.units.iter().map(move |unit| UnitHit {
                    unit: unit.clone(),
                    metadata: doc.metadata.clone(),
                    score: match cosine_similarity(&unit.embedding, embedding) {
                        score if score.is_nan() => f32::NEG_INFINITY,
                        score => score,
                    },
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Presentation summaries with previews of `preview_chars` characters.
    pub fn summaries(&self, preview_chars: usize) -> Vec<DocumentSummary> {
        self.iter().map(|d| d.summary(preview_chars)).collect()
    }
}
