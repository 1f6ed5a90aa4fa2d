//! Configuration for the retrieval engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::scoring::{DEFAULT_KEYWORD_BOOST, DEFAULT_RELEVANCE_THRESHOLD};
use crate::segment::SegmentMode;
use crate::window::WindowPolicy;

/// When documents are translated to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStage {
    /// Embed source-language units and translate only the answer window.
    ///
    /// Cheap to index, but search quality depends on the embedding model's
    /// cross-lingual alignment.
    #[default]
    Query,
    /// Translate every unit before embedding; answers need no translation.
    Index,
}

/// Configuration parameters for the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Unit granularity.
    pub segment_mode: SegmentMode,
    /// How the answer window is cut around the best unit.
    pub window_policy: WindowPolicy,
    /// Whether translation happens at index or query time.
    pub translation_stage: TranslationStage,
    /// Added once to a unit's score when any query word appears in it.
    pub keyword_boost: f32,
    /// Best scores strictly below this are reported as no result.
    pub relevance_threshold: f32,
    /// Number of units returned by ranked search.
    pub top_k: usize,
    /// Bound on each embedding or translation call.
    #[serde(with = "duration_millis")]
    pub provider_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            segment_mode: SegmentMode::default(),
            window_policy: WindowPolicy::default(),
            translation_stage: TranslationStage::default(),
            keyword_boost: DEFAULT_KEYWORD_BOOST,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            top_k: 5,
            provider_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Create a new builder for constructing an [`EngineConfig`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `keyword_boost` is negative or not finite
    /// - `relevance_threshold` is not finite
    /// - `top_k == 0`
    /// - the keyword window has `fallback_units == 0`
    /// - `provider_timeout` is zero
    pub fn validate(&self) -> Result<()> {
        if !self.keyword_boost.is_finite() || self.keyword_boost < 0.0 {
            return Err(RagError::ConfigError(format!(
                "keyword_boost ({}) must be a non-negative number",
                self.keyword_boost
            )));
        }
        if !self.relevance_threshold.is_finite() {
            return Err(RagError::ConfigError(format!(
                "relevance_threshold ({}) must be finite",
                self.relevance_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if let WindowPolicy::Keyword { fallback_units: 0, .. } = self.window_policy {
            return Err(RagError::ConfigError(
                "fallback_units must be greater than zero".to_string(),
            ));
        }
        if self.provider_timeout.is_zero() {
            return Err(RagError::ConfigError("provider_timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the unit granularity.
    pub fn segment_mode(mut self, mode: SegmentMode) -> Self {
        self.config.segment_mode = mode;
        self
    }

    /// Set the context window policy.
    pub fn window_policy(mut self, policy: WindowPolicy) -> Self {
        self.config.window_policy = policy;
        self
    }

    /// Set when documents are translated.
    pub fn translation_stage(mut self, stage: TranslationStage) -> Self {
        self.config.translation_stage = stage;
        self
    }

    /// Set the lexical boost increment.
    pub fn keyword_boost(mut self, boost: f32) -> Self {
        self.config.keyword_boost = boost;
        self
    }

    /// Set the rejection threshold.
    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    /// Set the number of units returned by ranked search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the bound on each collaborator call.
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.config.provider_timeout = timeout;
        self
    }

    /// Build the [`EngineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::validate`].
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
