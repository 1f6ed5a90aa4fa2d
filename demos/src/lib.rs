//! Deterministic providers shared by the demo binaries.
//!
//! Nothing here needs a model download or an API key.

use std::collections::HashMap;

use async_trait::async_trait;
use targum_rag::{EmbeddingProvider, Language, TranslationProvider};

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Character-trigram embeddings hashed into a fixed number of buckets.
///
/// Texts sharing many trigrams get a high cosine similarity, which is enough
/// to demonstrate ranking without a neural model.
pub struct TrigramEmbeddingProvider {
    dimensions: usize,
}

impl TrigramEmbeddingProvider {
    /// A provider hashing into `dimensions` buckets; zero is raised to one.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }
}

fn fnv1a(bytes: impl IntoIterator<Item = u8>) -> u64 {
    bytes.into_iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingProvider for TrigramEmbeddingProvider {
    fn name(&self) -> &str {
        "Trigram"
    }

    async fn embed(&self, text: &str) -> targum_rag::Result<Vec<f32>> {
        let chars: Vec<char> = format!("  {}  ", text.to_lowercase()).chars().collect();
        let mut emb = vec![0.0f32; self.dimensions];
        for gram in chars.windows(3) {
            let hash = fnv1a(gram.iter().collect::<String>().into_bytes());
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        // L2-normalise so cosine similarity is just the dot product.
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}


/// Word-for-word translation from a small Hebrew glossary.
///
/// Unknown words pass through unchanged; Yiddish is accepted and treated the
/// same way.
pub struct GlossaryTranslator {
    glossary: HashMap<&'static str, &'static str>,
}

impl Default for GlossaryTranslator {
    fn default() -> Self {
        Self {
            glossary: HashMap::from([
                ("התורה", "the Torah"),
                ("ניתנה", "was given"),
                ("בסיני", "at Sinai"),
                ("המכתב", "the letter"),
                ("נכתב", "was written"),
                ("על", "by"),
                ("ידי", ""),
                ("הרב", "the rabbi"),
                ("הלחם", "the bread"),
                ("נאפה", "was baked"),
                ("בבוקר", "in the morning"),
                ("הנהר", "the river"),
                ("זורם", "flows"),
                ("לים", "to the sea"),
                ("המלך", "the king"),
                ("בנה", "built"),
                ("ארמון", "a palace"),
                ("בעיר", "in the city"),
            ]),
        }
    }
}

#[async_trait]
impl TranslationProvider for GlossaryTranslator {
    fn name(&self) -> &str {
        "Glossary"
    }

    async fn translate(&self, text: &str, _source: Language) -> targum_rag::Result<String> {
        let lines: Vec<String> = text
            .lines()
            .map(|line| {
                line.split_whitespace()
                    .map(|word| {
                        let bare = word.trim_end_matches(['.', ',', '?', '!']);
                        let punct = &word[bare.len()..];
                        match self.glossary.get(bare) {
                            Some(english) => format!("{english}{punct}"),
                            None => word.to_string(),
                        }
                    })
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        Ok(lines.join("\n"))
    }

    async fn supports(&self, source: Language) -> targum_rag::Result<bool> {
        Ok(matches!(source, Language::Hebrew | Language::Yiddish | Language::English))
    }
}
