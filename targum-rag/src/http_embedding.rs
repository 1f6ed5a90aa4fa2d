//! Embedding provider for OpenAI-compatible `/v1/embeddings` servers.
//!
//! This module is only available when the `http` feature is enabled. Any
//! server speaking the OpenAI embeddings wire format works, including
//! self-hosted sentence-transformer servers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::provider::EmbeddingProvider;

/// The default multilingual model; embeds Hebrew, Yiddish and English into one space.
const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-multilingual-mpnet-base-v2";

/// The dimensionality of the default model.
const DEFAULT_DIMENSIONS: usize = 768;

const PROVIDER: &str = "HttpEmbedding";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings endpoint.
///
/// # Configuration
///
/// - `base_url` – server root, e.g. `http://localhost:8080`; `/v1/embeddings` is appended.
/// - `model` – defaults to `paraphrase-multilingual-mpnet-base-v2`.
/// - `dimensions` – must match the model; responses of any other length are rejected.
/// - `api_key` – optional bearer token.
///
/// # Example
///
/// ```rust,ignore
/// use targum_rag::http_embedding::HttpEmbeddingProvider;
///
/// let provider = HttpEmbeddingProvider::new("http://localhost:8080")?;
/// let embedding = provider.embed("שלום עולם").await?;
/// ```
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    /// Create a new provider for the server at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = base_url.as_ref().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "base URL must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{base_url}/v1/embeddings"),
            api_key: None,
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new provider from `TARGUM_EMBEDDING_URL` and optional `TARGUM_EMBEDDING_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("TARGUM_EMBEDDING_URL").map_err(|_| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "TARGUM_EMBEDDING_URL environment variable not set".into(),
            })?;
        let provider = Self::new(base_url)?;
        Ok(match std::env::var("TARGUM_EMBEDDING_KEY") {
            Ok(key) if !key.is_empty() => provider.with_api_key(key),
            _ => provider,
        })
    }

    /// Set the bearer token sent with each request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model name and its output dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn embedding_error(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| embedding_error("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest { model: &self.model, input: texts.to_vec() };
        let mut request = self.client.post(&self.endpoint).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            embedding_error(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(embedding_error(format!("API returned {status}: {detail}")));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            embedding_error(format!("failed to parse response: {e}"))
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(embedding_error(format!(
                "API returned {} embeddings for {} inputs",
                embedding_response.data.len(),
                texts.len()
            )));
        }
        embedding_response.data.sort_by_key(|d| d.index);

        let embeddings: Vec<Vec<f32>> =
            embedding_response.data.into_iter().map(|d| d.embedding).collect();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
