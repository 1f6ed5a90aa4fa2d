//! Retrieval engine orchestrator.
//!
//! The [`RetrievalEngine`] coordinates document indexing (decode → segment →
//! embed → store) and query answering (embed → score → window → translate)
//! by composing an [`EmbeddingProvider`], a [`TranslationProvider`], and a
//! [`RetrievalIndex`].
//!
//! # Example
//!
//! ```rust,ignore
//! use targum_rag::{DocumentSource, EngineConfig, InMemoryIndex, Language, RetrievalEngine};
//!
//! let engine = RetrievalEngine::builder()
//!     .config(EngineConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .translation_provider(Arc::new(my_translator))
//!     .index(Arc::new(InMemoryIndex::new()))
//!     .build()?;
//!
//! engine.verify_languages(&[Language::Hebrew, Language::Yiddish]).await?;
//! engine.index_document(DocumentSource::new("doc1.txt", bytes)).await?;
//! if let Some(answer) = engine.answer_query("who wrote the letter?").await? {
//!     println!("{} (score {})\n{}", answer.label, answer.display_score(), answer.passage);
//! }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, TranslationStage};
use crate::document::{
    Answer, DocumentMetadata, DocumentSummary, IndexReport, IndexedDocument, UnitHit,
};
use crate::error::{RagError, Result};
use crate::index::{DocumentSet, RetrievalIndex};
use crate::language::{Language, LanguageHint};
use crate::provider::{EmbeddingProvider, TranslationProvider};
use crate::scoring::{RelevanceScorer, meets_threshold};

/// An uploaded document awaiting indexing.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// Identifier to store the document under; assigned by the engine when `None`.
    pub id: Option<String>,
    /// Original filename or label.
    pub label: String,
    /// Raw UTF-8 bytes.
    pub bytes: Vec<u8>,
    /// Declared language or detection.
    pub language: LanguageHint,
}

impl DocumentSource {
    /// A source from raw bytes with language detection and an engine-assigned ID.
    pub fn new(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            label: label.into(),
            bytes: bytes.into(),
            language: LanguageHint::Detect,
        }
    }

    /// Store the document under `id`, replacing any document already there.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Declare the language, or pass [`LanguageHint::Detect`].
    pub fn with_language(mut self, language: impl Into<LanguageHint>) -> Self {
        self.language = language.into();
        self
    }
}

/// The retrieval engine orchestrator.
///
/// Construct one via [`RetrievalEngine::builder()`]. Indexing is
/// all-or-nothing: every unit is translated (when configured) and embedded
/// before the document is handed to the index, so a provider failure leaves
/// the index untouched.
pub struct RetrievalEngine {
    config: EngineConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    translation_provider: Arc<dyn TranslationProvider>,
    index: Arc<dyn RetrievalIndex>,
    scorer: RelevanceScorer,
    next_id: AtomicU64,
    verified_languages: RwLock<HashSet<Language>>,
}

impl RetrievalEngine {
    /// Create a new [`RetrievalEngineBuilder`].
    pub fn builder() -> RetrievalEngineBuilder {
        RetrievalEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Return a reference to the retrieval index.
    pub fn index(&self) -> &Arc<dyn RetrievalIndex> {
        &self.index
    }

    /// Run a collaborator call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let after = self.config.provider_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(result) => result,
            Err(_) => {
                error!(operation, timeout_ms = after.as_millis() as u64, "provider call timed out");
                Err(RagError::Timeout { operation: operation.to_string(), after })
            }
        }
    }

    /// Check once that the translation provider covers `language → en`.
    ///
    /// Positive answers are cached; English needs no check.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedLanguage`] if no model is installed for
    /// the pair, or the provider's own error if the check fails.
    pub async fn ensure_language(&self, language: Language) -> Result<()> {
        if !language.needs_translation() || self.verified_languages.read().await.contains(&language)
        {
            return Ok(());
        }

        let provider = self.translation_provider.name();
        let supported = self
            .bounded("translation support check", self.translation_provider.supports(language))
            .await?;
        if !supported {
            error!(provider, language = %language, "no translation model installed");
            return Err(RagError::UnsupportedLanguage { provider: provider.to_string(), language });
        }

        self.verified_languages.write().await.insert(language);
        info!(provider, language = %language, "translation model available");
        Ok(())
    }

    /// Startup precondition: check every language the deployment expects.
    ///
    /// # Errors
    ///
    /// Fails on the first language without an installed model.
    pub async fn verify_languages(&self, languages: &[Language]) -> Result<()> {
        for language in languages {
            self.ensure_language(*language).await?;
        }
        Ok(())
    }

    /// The next `doc-{n}` not already held by `existing`.
    ///
    /// The counter starts at zero for every engine, so IDs left in a durable
    /// index or chosen by callers are skipped rather than overwritten.
    fn assign_id(&self, existing: &DocumentSet) -> String {
        loop {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            let candidate = format!("doc-{n}");
            if existing.get(&candidate).is_none() {
                return candidate;
            }
            debug!(document.id = %candidate, "assigned id already taken");
        }
    }

    fn query_vector_error(&self, vector: &[f32]) -> Option<RagError> {
        vector.iter().any(|x| !x.is_finite()).then(|| RagError::EmbeddingError {
            provider: self.embedding_provider.name().to_string(),
            message: "query embedding contains non-finite values".to_string(),
        })
    }

    async fn embed_units(&self, document_id: &str, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let provider = self.embedding_provider.name();
        let embeddings = self
            .bounded("embedding", self.embedding_provider.embed_batch(texts))
            .await
            .inspect_err(|e| {
                error!(
                    document.id = document_id,
                    provider,
                    error = %e,
                    "embedding failed during indexing"
                );
            })?;

        if embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: provider.to_string(),
                message: format!(
                    "returned {} embeddings for {} units of document '{document_id}'",
                    embeddings.len(),
                    texts.len()
                ),
            });
        }
        let expected = self.embedding_provider.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(RagError::DimensionMismatch { expected, actual: bad.len() });
        }
        if let Some(position) = embeddings.iter().position(|e| e.iter().any(|x| !x.is_finite())) {
            return Err(RagError::EmbeddingError {
                provider: provider.to_string(),
                message: format!(
                    "unit {position} of document '{document_id}' has a non-finite embedding"
                ),
            });
        }
        Ok(embeddings)
    }

    /// Index a document: decode → detect language → segment → embed → store.
    ///
    /// A document with an ID already in the index replaces it atomically. A
    /// document that yields no units is not stored and reports `unit_count == 0`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DecodeError`] for non-UTF-8 input,
    /// [`RagError::UnsupportedLanguage`] when the source language cannot be
    /// translated, and propagates provider and index failures. On any error
    /// nothing of the document is stored.
    pub async fn index_document(&self, source: DocumentSource) -> Result<IndexReport> {
        let DocumentSource { id, label, bytes, language } = source;

        let text = String::from_utf8(bytes).map_err(|e| {
            warn!(label = %label, error = %e, "rejected non-UTF-8 document");
            RagError::DecodeError { label: label.clone(), message: e.to_string() }
        })?;
        let language = language.resolve(&text);
        let document_id = match id {
            Some(id) => id,
            None => self.assign_id(&*self.index.snapshot().await?),
        };

        let mut unit_texts = self.config.segment_mode.segment(&text);
        if unit_texts.is_empty() {
            info!(
                document.id = %document_id,
                label = %label,
                unit_count = 0,
                "indexed document (empty)"
            );
            return Ok(IndexReport { document_id, language, unit_count: 0 });
        }

        self.ensure_language(language).await?;

        let units_translated = self.config.translation_stage == TranslationStage::Index
            && language.needs_translation();
        if units_translated {
            let sources: Vec<&str> = unit_texts.iter().map(String::as_str).collect();
            let translated = self
                .bounded(
                    "translation",
                    self.translation_provider.translate_batch(&sources, language),
                )
                .await
                .inspect_err(|e| {
                    error!(
                        document.id = %document_id,
                        error = %e,
                        "translation failed during indexing"
                    );
                })?;
            if translated.len() != unit_texts.len() {
                return Err(RagError::TranslationError {
                    provider: self.translation_provider.name().to_string(),
                    message: format!(
                        "returned {} translations for {} units of document '{document_id}'",
                        translated.len(),
                        unit_texts.len()
                    ),
                });
            }
            unit_texts = translated;
        }

        let texts: Vec<&str> = unit_texts.iter().map(String::as_str).collect();
        let embeddings = self.embed_units(&document_id, &texts).await?;

        let metadata = DocumentMetadata { label, language, units_translated };
        let document =
            IndexedDocument::new(document_id.clone(), text, metadata, unit_texts, embeddings)?;
        let unit_count = document.units.len();

        self.index.add(document).await.inspect_err(|e| {
            error!(
                document.id = %document_id,
                backend = self.index.backend(),
                error = %e,
                "store failed during indexing"
            );
        })?;

        info!(document.id = %document_id, language = %language, unit_count, "indexed document");
        Ok(IndexReport { document_id, language, unit_count })
    }

    /// Answer a question with the best-matching passage rendered in English.
    ///
    /// Every unit in the index is scored with cosine similarity plus the
    /// keyword boost; the best unit is widened into a context window and
    /// translated with its document's recorded language.
    ///
    /// Returns `Ok(None)` for an empty query, an empty index, or a best score
    /// below the relevance threshold.
    ///
    /// # Errors
    ///
    /// Propagates embedding and translation failures, and returns
    /// [`RagError::DimensionMismatch`] if the query vector does not match the index.
    pub async fn answer_query(&self, query: &str) -> Result<Option<Answer>> {
        if query.trim().is_empty() {
            debug!("empty query");
            return Ok(None);
        }

        let snapshot = self.index.snapshot().await?;
        if snapshot.is_empty() {
            debug!("query against empty index");
            return Ok(None);
        }

        let query_vector = self
            .bounded("query embedding", self.embedding_provider.embed(query))
            .await
            .inspect_err(|e| error!(error = %e, "embedding failed during query"))?;
        if let Some(err) = self.query_vector_error(&query_vector) {
            return Err(err);
        }
        if let Some(expected) = snapshot.dimensions() {
            if expected != query_vector.len() {
                return Err(RagError::DimensionMismatch { expected, actual: query_vector.len() });
            }
        }

        let Some(best) = self.scorer.best_match(query, &query_vector, snapshot.iter()) else {
            return Ok(None);
        };
        let threshold = self.config.relevance_threshold;
        if !meets_threshold(best.score, threshold) {
            info!(score = best.score, threshold, "no relevant result");
            return Ok(None);
        }

        let document = best.document;
        let window =
            self.config.window_policy.extract(&document.unit_texts(), best.position, query);

        let unit_language = document.metadata.unit_language();
        let passage = if unit_language.needs_translation() {
            self.ensure_language(unit_language).await?;
            let call = self.translation_provider.translate(&window.text, unit_language);
            self.bounded("translation", call).await.inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "translation failed during query");
            })?
        } else {
            window.text.clone()
        };

        info!(
            document.id = %document.id,
            position = best.position,
            score = best.score,
            "query answered"
        );

        Ok(Some(Answer {
            document_id: document.id.clone(),
            label: document.metadata.label.clone(),
            language: document.metadata.language,
            passage,
            source_passage: window.text,
            position: best.position,
            window: (window.start, window.end),
            score: best.score,
        }))
    }

    /// Ranked nearest units by pure vector similarity, using the configured `top_k`.
    ///
    /// # Errors
    ///
    /// Propagates embedding and index failures.
    pub async fn search(&self, query: &str) -> Result<Vec<UnitHit>> {
        self.search_with_top_k(query, self.config.top_k).await
    }

    /// Ranked nearest units by pure vector similarity.
    ///
    /// Unit texts are returned as stored; no translation is applied.
    ///
    /// # Errors
    ///
    /// Propagates embedding and index failures.
    pub async fn search_with_top_k(&self, query: &str, top_k: usize) -> Result<Vec<UnitHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self
            .bounded("query embedding", self.embedding_provider.embed(query))
            .await
            .inspect_err(|e| error!(error = %e, "embedding failed during search"))?;
        if let Some(err) = self.query_vector_error(&query_vector) {
            return Err(err);
        }
        let hits = self.index.query(&query_vector, top_k).await?;
        info!(result_count = hits.len(), "search completed");
        Ok(hits)
    }

    /// Remove a document and its units. Unknown IDs are a no-op.
    ///
    /// # Errors
    ///
    /// Propagates index failures.
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        self.index.delete(document_id).await?;
        info!(document.id = document_id, "deleted document");
        Ok(())
    }

    /// One summary per indexed document.
    ///
    /// # Errors
    ///
    /// Propagates index failures.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.index.list().await
    }

    /// Drop every indexed document, as before a fresh upload.
    ///
    /// # Errors
    ///
    /// Propagates index failures.
    pub async fn reset(&self) -> Result<()> {
        self.index.clear().await?;
        info!("index reset");
        Ok(())
    }

    /// Whether no document is currently indexed.
    ///
    /// # Errors
    ///
    /// Propagates index failures.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.index.snapshot().await?.is_empty())
    }
}

/// Builder for constructing a [`RetrievalEngine`].
///
/// All fields are required. Call [`build()`](RetrievalEngineBuilder::build)
/// to validate and produce the engine.
#[derive(Default)]
pub struct RetrievalEngineBuilder {
    config: Option<EngineConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    translation_provider: Option<Arc<dyn TranslationProvider>>,
    index: Option<Arc<dyn RetrievalIndex>>,
}

impl RetrievalEngineBuilder {
    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the translation provider.
    pub fn translation_provider(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        self.translation_provider = Some(provider);
        self
    }

    /// Set the retrieval index backend.
    pub fn index(mut self, index: Arc<dyn RetrievalIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Build the [`RetrievalEngine`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<RetrievalEngine> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let translation_provider = self.translation_provider.ok_or_else(|| {
            RagError::ConfigError("translation_provider is required".to_string())
        })?;
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;

        Ok(RetrievalEngine {
            scorer: RelevanceScorer::new(config.keyword_boost),
            config,
            embedding_provider,
            translation_provider,
            index,
            next_id: AtomicU64::new(0),
            verified_languages: RwLock::new(HashSet::new()),
        })
    }
}
