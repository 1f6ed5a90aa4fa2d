//! In-memory retrieval index using cosine similarity.
//!
//! This module provides [`InMemoryIndex`], an ephemeral index backed by a
//! [`DocumentSet`] behind a `tokio::sync::RwLock`. Its contents are lost when
//! the process exits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{DocumentSummary, IndexedDocument, UnitHit};
use crate::error::Result;
use crate::index::{DEFAULT_PREVIEW_CHARS, DocumentSet, RetrievalIndex};

/// An in-memory retrieval index.
///
/// Writers build a new [`DocumentSet`] and swap it in under the write lock;
/// readers clone the current `Arc` and scan it without holding the lock, so
/// a long query never blocks indexing and never observes a half-indexed
/// document.
///
/// # Example
///
/// ```rust,ignore
/// use targum_rag::{InMemoryIndex, RetrievalIndex};
///
/// let index = InMemoryIndex::new();
/// index.add(document).await?;
/// assert_eq!(index.list().await?.len(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryIndex {
    documents: RwLock<Arc<DocumentSet>>,
    preview_chars: usize,
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIndex {
    /// Create an empty index that adopts the dimensionality of its first document.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Arc::new(DocumentSet::default())),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Create an empty index that only accepts vectors of `dimensions` length.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            documents: RwLock::new(Arc::new(DocumentSet::new(Some(dimensions)))),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Set the preview length used by [`list`](RetrievalIndex::list).
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }
}

#[async_trait]
impl RetrievalIndex for InMemoryIndex {
    fn backend(&self) -> &str {
        "InMemory"
    }

    async fn add(&self, document: IndexedDocument) -> Result<()> {
        let mut documents = self.documents.write().await;
        let document_id = document.id.clone();
        let next = documents.with_document(document)?;
        *documents = Arc::new(next);
        debug!(backend = "InMemory", document.id = %document_id, "document stored");
        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<()> {
        let mut documents = self.documents.write().await;
        if let Some(next) = documents.without_document(document_id) {
            *documents = Arc::new(next);
            debug!(backend = "InMemory", document.id = document_id, "document deleted");
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.summaries(self.preview_chars))
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<UnitHit>> {
        let snapshot = self.snapshot().await?;
        snapshot.nearest(embedding, top_k)
    }

    async fn snapshot(&self) -> Result<Arc<DocumentSet>> {
        Ok(Arc::clone(&*self.documents.read().await))
    }

    async fn clear(&self) -> Result<()> {
        let mut documents = self.documents.write().await;
        *documents = Arc::new(documents.cleared());
        Ok(())
    }
}
