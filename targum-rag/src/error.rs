//! Error types for the `targum-rag` crate.

use std::time::Duration;

use thiserror::Error;

use crate::language::Language;

/// Errors that can occur while indexing documents or answering queries.
///
/// An empty index, an empty query, or a below-threshold match are not
/// errors; [`RetrievalEngine::answer_query`](crate::RetrievalEngine::answer_query)
/// reports those as `Ok(None)`.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while translating text to English.
    #[error("Translation error ({provider}): {message}")]
    TranslationError {
        /// The translation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The translation provider has no installed model for `language → en`.
    #[error("Unsupported language pair ({provider}): no {language} → en model is installed")]
    UnsupportedLanguage {
        /// The translation provider that was asked.
        provider: String,
        /// The source language with no installed model.
        language: Language,
    },

    /// An error occurred in the retrieval index backend.
    #[error("Index error ({backend}): {message}")]
    IndexError {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An uploaded document is not valid UTF-8 text.
    #[error("Decode error ({label}): {message}")]
    DecodeError {
        /// The filename or label of the rejected document.
        label: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector does not match the dimensionality of the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality the index was built with.
        expected: usize,
        /// The dimensionality that was supplied.
        actual: usize,
    },

    /// A collaborator call did not complete within the configured timeout.
    #[error("Timeout: {operation} did not complete within {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The configured bound.
        after: Duration,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the engine orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
