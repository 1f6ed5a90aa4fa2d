//! Translation provider for LibreTranslate servers.
//!
//! This module is only available when the `http` feature is enabled.
//! LibreTranslate is the HTTP front end of Argos Translate; the installed
//! language packages are listed by `GET /languages`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::language::Language;
use crate::provider::TranslationProvider;

const PROVIDER: &str = "LibreTranslate";

/// A [`TranslationProvider`] backed by a LibreTranslate server.
///
/// # Example
///
/// ```rust,ignore
/// use targum_rag::libretranslate::LibreTranslateProvider;
///
/// let translator = LibreTranslateProvider::new("http://localhost:5000")?;
/// assert!(translator.supports(Language::Hebrew).await?);
/// ```
pub struct LibreTranslateProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LibreTranslateProvider {
    /// Create a new provider for the server at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = base_url.as_ref().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(translation_error("base URL must not be empty"));
        }
        Ok(Self { client: reqwest::Client::new(), base_url: base_url.to_string(), api_key: None })
    }

    /// Create a new provider from `TARGUM_TRANSLATE_URL` and optional `TARGUM_TRANSLATE_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("TARGUM_TRANSLATE_URL")
            .map_err(|_| translation_error("TARGUM_TRANSLATE_URL environment variable not set"))?;
        let provider = Self::new(base_url)?;
        Ok(match std::env::var("TARGUM_TRANSLATE_KEY") {
            Ok(key) if !key.is_empty() => provider.with_api_key(key),
            _ => provider,
        })
    }

    /// Set the API key sent with each request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn error_detail(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
        format!("API returned {status}: {detail}")
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Deserialize)]
struct LanguageEntry {
    code: String,
    #[serde(default)]
    targets: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

fn translation_error(message: impl Into<String>) -> RagError {
    RagError::TranslationError { provider: PROVIDER.into(), message: message.into() }
}

// ── TranslationProvider implementation ─────────────────────────────

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn translate(&self, text: &str, source: Language) -> Result<String> {
        if !source.needs_translation() || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        debug!(provider = PROVIDER, source = %source, text_len = text.len(), "translating");

        let body = TranslateRequest {
            q: text,
            source: source.code(),
            target: Language::English.code(),
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                translation_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = Self::error_detail(response).await;
            error!(provider = PROVIDER, source = %source, "API error");
            return Err(translation_error(message));
        }

        let parsed: TranslateResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            translation_error(format!("failed to parse response: {e}"))
        })?;
        Ok(parsed.translated_text)
    }

    async fn supports(&self, source: Language) -> Result<bool> {
        if !source.needs_translation() {
            return Ok(true);
        }

        let response =
            self.client.get(format!("{}/languages", self.base_url)).send().await.map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                translation_error(format!("request failed: {e}"))
            })?;
        if !response.status().is_success() {
            return Err(translation_error(Self::error_detail(response).await));
        }

        let languages: Vec<LanguageEntry> = response.json().await.map_err(|e| {
            translation_error(format!("failed to parse language list: {e}"))
        })?;
        let english = Language::English.code();
        Ok(languages
            .iter()
            .any(|l| l.code == source.code() && l.targets.iter().any(|t| t == english)))
    }
}
