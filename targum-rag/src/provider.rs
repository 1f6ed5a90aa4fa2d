//! Collaborator traits: the embedding model and the machine translator.
//!
//! The engine owns neither model. Both are injected behind these traits and
//! every call is bounded by the engine's provider timeout.

use async_trait::async_trait;

use crate::error::Result;
use crate::language::Language;

/// Maps text in any supported language into one shared vector space.
///
/// Units and queries are only comparable when they come from the same
/// provider, so an implementation must return vectors of a single
/// [`dimensions`](EmbeddingProvider::dimensions) length and the same vector
/// for the same text.
///
/// ```rust,ignore
/// let vector = provider.embed("שלום עולם").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logs and error values.
    fn name(&self) -> &str;

    /// Embed one unit or query.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed every unit of one document, in order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}

/// Renders Hebrew or Yiddish text in English.
///
/// A missing `source → en` model is a deployment problem, reported through
/// [`supports`](TranslationProvider::supports) rather than discovered per
/// call. [`translate`](TranslationProvider::translate) fails instead of
/// echoing its input.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Provider name for logs and error values.
    fn name(&self) -> &str;

    /// Translate `text`, written in `source`, into English.
    async fn translate(&self, text: &str, source: Language) -> Result<String>;

    /// Translate the units of one document, in order.
    async fn translate_batch(&self, texts: &[&str], source: Language) -> Result<Vec<String>> {
        let mut translated = Vec::with_capacity(texts.len());
        for text in texts {
            translated.push(self.translate(text, source).await?);
        }
        Ok(translated)
    }

    /// Whether a `source → en` model is installed.
    async fn supports(&self, source: Language) -> Result<bool>;
}
