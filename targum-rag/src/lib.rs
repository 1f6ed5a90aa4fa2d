//! Semantic retrieval over Hebrew and Yiddish documents with English answers.
//!
//! This crate provides:
//! - Paragraph, sentence, and whole-document segmentation
//! - Relevance scoring that blends cosine similarity with a lexical boost
//! - Positional and keyword context windows around the best match
//! - In-memory and file-backed retrieval indexes with atomic document replacement
//! - The [`RetrievalEngine`] that ties them to embedding and translation providers
//!
//! Embedding and translation are delegated to [`EmbeddingProvider`] and
//! [`TranslationProvider`] implementations; the `http` feature adds
//! OpenAI-compatible embedding and LibreTranslate clients.

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod file;
pub mod index;
pub mod inmemory;
pub mod language;
pub mod provider;
pub mod scoring;
pub mod segment;
pub mod window;

#[cfg(feature = "http")]
pub mod http_embedding;
#[cfg(feature = "http")]
pub mod libretranslate;

pub use config::{EngineConfig, EngineConfigBuilder, TranslationStage};
pub use document::{
    Answer, DocumentMetadata, DocumentSummary, IndexReport, IndexedDocument, Unit, UnitHit,
};
pub use engine::{DocumentSource, RetrievalEngine, RetrievalEngineBuilder};
pub use error::{RagError, Result};
pub use file::FileIndex;
pub use index::{DocumentSet, RetrievalIndex};
pub use inmemory::InMemoryIndex;
pub use language::{Language, LanguageHint, detect_language};
pub use provider::{EmbeddingProvider, TranslationProvider};
pub use scoring::{RelevanceScorer, cosine_similarity};
pub use segment::{SegmentMode, segment};
pub use window::{ContextWindow, WindowPolicy};

#[cfg(feature = "http")]
pub use http_embedding::HttpEmbeddingProvider;
#[cfg(feature = "http")]
pub use libretranslate::LibreTranslateProvider;
