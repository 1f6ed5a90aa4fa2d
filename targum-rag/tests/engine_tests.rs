//! End-to-end tests for the retrieval engine with deterministic providers.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use targum_rag::{
    DocumentSource, EmbeddingProvider, EngineConfig, FileIndex, InMemoryIndex, Language,
    RagError, RetrievalEngine, RetrievalIndex, SegmentMode, TranslationProvider,
    TranslationStage, WindowPolicy,
};

// ---------------------------------------------------------------------------
// ConceptEmbeddingProvider: one dimension per concept, matched in English or Hebrew
// ---------------------------------------------------------------------------

const CONCEPTS: [&[&str]; 5] = [
    &["torah", "תורה"],
    &["letter", "מכתב"],
    &["bread", "לחם"],
    &["river", "נהר"],
    &["king", "מלך"],
];

#[derive(Default)]
struct ConceptEmbeddingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for ConceptEmbeddingProvider {
    fn name(&self) -> &str {
        "Concept"
    }

    async fn embed(&self, text: &str) -> targum_rag::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL") {
            return Err(RagError::EmbeddingError {
                provider: "Concept".into(),
                message: "refusing to embed".into(),
            });
        }
        if text.contains("NAN") {
            return Ok(vec![f32::NAN; CONCEPTS.len()]);
        }
        let lower = text.to_lowercase();
        Ok(CONCEPTS
            .iter()
            .map(|forms| if forms.iter().any(|f| lower.contains(f)) { 1.0 } else { 0.0 })
            .collect())
    }

    fn dimensions(&self) -> usize {
        CONCEPTS.len()
    }
}

struct SlowEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for SlowEmbeddingProvider {
    fn name(&self) -> &str {
        "Slow"
    }

    async fn embed(&self, _text: &str) -> targum_rag::Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![1.0; 5])
    }

    fn dimensions(&self) -> usize {
        5
    }
}

// ---------------------------------------------------------------------------
// TaggingTranslator: prefixes text with the language pair it was asked for
// ---------------------------------------------------------------------------

struct TaggingTranslator {
    installed: HashSet<Language>,
    support_checks: AtomicUsize,
    translations: AtomicUsize,
}

impl TaggingTranslator {
    fn new(installed: &[Language]) -> Self {
        Self {
            installed: installed.iter().copied().collect(),
            support_checks: AtomicUsize::new(0),
            translations: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TranslationProvider for TaggingTranslator {
    fn name(&self) -> &str {
        "Tagging"
    }

    async fn translate(&self, text: &str, source: Language) -> targum_rag::Result<String> {
        self.translations.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{source}->en] {text}"))
    }

    async fn supports(&self, source: Language) -> targum_rag::Result<bool> {
        self.support_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.installed.contains(&source))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const HEBREW_DOC: &str = "התורה ניתנה בסיני.\n\nהמכתב נכתב על ידי הרב.\n\nהלחם נאפה בבוקר.\n\nהנהר זורם לים.";

const ENGLISH_SENTENCES: &str =
    "The king rode out. He crossed the river. Bread was shared. Night fell. Morning came. The end.";

struct Harness {
    engine: RetrievalEngine,
    embedder: Arc<ConceptEmbeddingProvider>,
    translator: Arc<TaggingTranslator>,
}

fn harness_with(config: EngineConfig, index: Arc<dyn RetrievalIndex>) -> Harness {
    let embedder = Arc::new(ConceptEmbeddingProvider::default());
    let translator = Arc::new(TaggingTranslator::new(&[Language::Hebrew, Language::Yiddish]));
    let engine = RetrievalEngine::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .translation_provider(translator.clone())
        .index(index)
        .build()
        .unwrap();
    Harness { engine, embedder, translator }
}

fn harness(config: EngineConfig) -> Harness {
    harness_with(config, Arc::new(InMemoryIndex::new()))
}

fn hebrew(id: &str, text: &str) -> DocumentSource {
    DocumentSource::new(format!("{id}.txt"), text).with_id(id).with_language(Language::Hebrew)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_index_and_empty_query_yield_no_result() {
    let h = harness(EngineConfig::default());
    assert!(h.engine.is_empty().await.unwrap());
    assert!(h.engine.answer_query("who wrote the letter?").await.unwrap().is_none());

    h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();
    assert!(h.engine.answer_query("   ").await.unwrap().is_none());
}

#[tokio::test]
async fn answers_with_translated_positional_window() {
    let h = harness(EngineConfig::default());
    let report = h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();
    assert_eq!(report.unit_count, 4);
    assert_eq!(report.language, Language::Hebrew);

    let answer = h.engine.answer_query("who wrote the letter?").await.unwrap().unwrap();
    assert_eq!(answer.document_id, "d1");
    assert_eq!(answer.label, "d1.txt");
    assert_eq!(answer.position, 1);
    assert_eq!(answer.window, (0, 3));
    assert_eq!(
        answer.source_passage,
        "התורה ניתנה בסיני.\n\nהמכתב נכתב על ידי הרב.\n\nהלחם נאפה בבוקר."
    );
    assert_eq!(answer.passage, format!("[he->en] {}", answer.source_passage));
    assert_eq!(answer.display_score(), "1.000");
}

#[tokio::test]
async fn best_match_is_chosen_across_documents() {
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("torah", "התורה ניתנה בסיני.")).await.unwrap();
    h.engine.index_document(hebrew("bread", "הלחם נאפה בבוקר.\n\nהנהר זורם לים.")).await.unwrap();

    let answer = h.engine.answer_query("fresh bread").await.unwrap().unwrap();
    assert_eq!(answer.document_id, "bread");
    assert_eq!(answer.position, 0);
    assert_eq!(answer.window, (0, 2));
}

#[tokio::test]
async fn below_threshold_is_no_result_and_equal_is_accepted() {
    // "מהרב" is in the text but is no concept: keyword boost only, score 0.2.
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("d1", "מכתב מהרב")).await.unwrap();
    assert!(h.engine.answer_query("weather forecast").await.unwrap().is_none());
    assert!(h.engine.answer_query("מהרב").await.unwrap().is_none());

    let lenient = harness(EngineConfig::builder().relevance_threshold(0.2).build().unwrap());
    lenient.engine.index_document(hebrew("d1", "מכתב מהרב")).await.unwrap();
    let answer = lenient.engine.answer_query("מהרב").await.unwrap().unwrap();
    assert_eq!(answer.score, 0.2);
}

#[tokio::test]
async fn deleted_document_is_never_returned() {
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();
    assert!(h.engine.answer_query("the letter").await.unwrap().is_some());

    h.engine.delete_document("d1").await.unwrap();
    h.engine.delete_document("d1").await.unwrap();
    assert!(h.engine.answer_query("the letter").await.unwrap().is_none());
    assert!(h.engine.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn reindexing_an_id_replaces_all_units() {
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("x", HEBREW_DOC)).await.unwrap();
    h.engine.index_document(hebrew("x", "מלך העיר.")).await.unwrap();

    let listed = h.engine.list_documents().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "x");
    assert_eq!(listed[0].unit_count, 1);
    assert_eq!(listed[0].preview, "מלך העיר.");

    assert!(h.engine.answer_query("the letter").await.unwrap().is_none());
    let answer = h.engine.answer_query("the king").await.unwrap().unwrap();
    assert_eq!(answer.source_passage, "מלך העיר.");
}

#[tokio::test]
async fn invalid_utf8_is_rejected_without_indexing() {
    let h = harness(EngineConfig::default());
    let source = DocumentSource::new("broken.txt", vec![0xD7u8, 0x90, 0xFF, 0xFE]);
    let err = h.engine.index_document(source).await.unwrap_err();
    assert!(matches!(err, RagError::DecodeError { ref label, .. } if label == "broken.txt"));
    assert!(h.engine.is_empty().await.unwrap());
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_document_indexes_nothing() {
    let h = harness(EngineConfig::default());
    let report = h.engine.index_document(hebrew("blank", "\n\n   \n")).await.unwrap();
    assert_eq!(report.unit_count, 0);
    assert!(h.engine.is_empty().await.unwrap());
}

#[tokio::test]
async fn embedding_failure_leaves_previous_version_intact() {
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();

    let err = h
        .engine
        .index_document(hebrew("d1", "מלך העיר.\n\nFAIL here\n\nנהר"))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));

    let listed = h.engine.list_documents().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].unit_count, 4);
    assert!(h.engine.answer_query("the king").await.unwrap().is_none());
}

#[tokio::test]
async fn unsupported_language_is_a_configuration_error() {
    let embedder = Arc::new(ConceptEmbeddingProvider::default());
    let translator = Arc::new(TaggingTranslator::new(&[Language::Hebrew]));
    let engine = RetrievalEngine::builder()
        .config(EngineConfig::default())
        .embedding_provider(embedder)
        .translation_provider(translator.clone())
        .index(Arc::new(InMemoryIndex::new()))
        .build()
        .unwrap();

    let err = engine.verify_languages(&[Language::Hebrew, Language::Yiddish]).await.unwrap_err();
    assert!(matches!(err, RagError::UnsupportedLanguage { language: Language::Yiddish, .. }));

    let source = DocumentSource::new("yi.txt", "א בריוו \u{FB4E}ון דעם רבין");
    let err = engine.index_document(source).await.unwrap_err();
    assert!(matches!(err, RagError::UnsupportedLanguage { language: Language::Yiddish, .. }));
    assert!(engine.is_empty().await.unwrap());

    // Hebrew was verified once and is not asked about again.
    let checks = translator.support_checks.load(Ordering::SeqCst);
    engine.index_document(hebrew("a", "מכתב")).await.unwrap();
    engine.index_document(hebrew("b", "לחם")).await.unwrap();
    engine.answer_query("letter").await.unwrap().unwrap();
    assert_eq!(translator.support_checks.load(Ordering::SeqCst), checks);
}

#[tokio::test]
async fn yiddish_is_detected_and_translated_as_yiddish() {
    let h = harness(EngineConfig::default());
    let report = h
        .engine
        .index_document(DocumentSource::new("yi.txt", "דער מלך \u{FB2F}ון ד\u{05F2}ן ל\u{FB2E}נד"))
        .await
        .unwrap();
    assert_eq!(report.language, Language::Yiddish);
    assert_eq!(report.document_id, "doc-1");

    let answer = h.engine.answer_query("the king").await.unwrap().unwrap();
    assert_eq!(answer.language, Language::Yiddish);
    assert!(answer.passage.starts_with("[yi->en] "));
}

#[tokio::test]
async fn assigned_ids_are_distinct() {
    let h = harness(EngineConfig::default());
    let a = h.engine.index_document(DocumentSource::new("a.txt", "מכתב")).await.unwrap();
    let b = h.engine.index_document(DocumentSource::new("a.txt", "מכתב")).await.unwrap();
    assert_ne!(a.document_id, b.document_id);
    assert_eq!(h.engine.list_documents().await.unwrap().len(), 2);
}

#[tokio::test]
async fn assigned_ids_skip_ids_chosen_by_callers() {
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("doc-1", "מכתב")).await.unwrap();

    let report = h.engine.index_document(DocumentSource::new("other.txt", "לחם")).await.unwrap();
    assert_eq!(report.document_id, "doc-2");

    let labels: Vec<(String, String)> = h
        .engine
        .list_documents()
        .await
        .unwrap()
        .into_iter()
        .map(|d| (d.id, d.label))
        .collect();
    assert_eq!(
        labels,
        [
            ("doc-1".to_string(), "doc-1.txt".to_string()),
            ("doc-2".to_string(), "other.txt".to_string()),
        ]
    );
}

#[tokio::test]
async fn assigned_ids_skip_ids_left_in_a_reopened_file_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    {
        let index = Arc::new(FileIndex::open(&path).await.unwrap());
        let h = harness_with(EngineConfig::default(), index);
        let source = DocumentSource::new("first.txt", "מכתב");
        let report = h.engine.index_document(source).await.unwrap();
        assert_eq!(report.document_id, "doc-1");
    }

    let index = Arc::new(FileIndex::open(&path).await.unwrap());
    let h = harness_with(EngineConfig::default(), index);
    let report = h.engine.index_document(DocumentSource::new("second.txt", "לחם")).await.unwrap();
    assert_eq!(report.document_id, "doc-2");

    let listed = h.engine.list_documents().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].label, "first.txt");
    assert_eq!(listed[1].label, "second.txt");
}

#[tokio::test]
async fn non_finite_embeddings_are_rejected() {
    let h = harness(EngineConfig::default());

    let err = h.engine.index_document(hebrew("d1", "מכתב\n\nNAN")).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));
    assert!(h.engine.is_empty().await.unwrap());

    h.engine.index_document(hebrew("d2", HEBREW_DOC)).await.unwrap();
    let err = h.engine.answer_query("NAN letter").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));
    let err = h.engine.search("NAN letter").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));
}

#[tokio::test]
async fn index_time_translation_skips_query_time_translation() {
    let config =
        EngineConfig::builder().translation_stage(TranslationStage::Index).build().unwrap();
    let h = harness(config);
    h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();
    assert_eq!(h.translator.translations.load(Ordering::SeqCst), 4);

    let answer = h.engine.answer_query("the letter").await.unwrap().unwrap();
    assert_eq!(answer.language, Language::Hebrew);
    assert_eq!(answer.passage, answer.source_passage);
    assert!(answer.passage.starts_with("[he->en] "));
    assert_eq!(h.translator.translations.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn sentence_keyword_window_uses_lexical_hit_or_falls_back() {
    let config = EngineConfig::builder()
        .segment_mode(SegmentMode::Sentence)
        .window_policy(WindowPolicy::keyword())
        .build()
        .unwrap();
    let h = harness(config);
    let source =
        DocumentSource::new("story.txt", ENGLISH_SENTENCES).with_language(Language::English);
    let report = h.engine.index_document(source).await.unwrap();
    assert_eq!(report.unit_count, 6);

    let answer = h.engine.answer_query("bread").await.unwrap().unwrap();
    assert_eq!(answer.passage, "The king rode out. He crossed the river. Bread was shared. Night fell. Morning came.");

    let answer = h.engine.answer_query("who was the king").await.unwrap().unwrap();
    assert_eq!(answer.position, 0);
    assert_eq!(answer.passage, "The king rode out. He crossed the river. Bread was shared. Night fell.");
    assert_eq!(h.translator.translations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ranked_search_spans_documents() {
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();
    h.engine.index_document(hebrew("d2", "המלך והמכתב")).await.unwrap();

    let hits = h.engine.search_with_top_k("letter", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
    let ids: HashSet<&str> = hits.iter().map(|h| h.unit.document_id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(h.engine.search("").await.unwrap().is_empty());
}

#[tokio::test]
async fn reset_clears_every_document() {
    let h = harness(EngineConfig::default());
    h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();
    h.engine.index_document(hebrew("d2", "מלך")).await.unwrap();
    h.engine.reset().await.unwrap();
    assert!(h.engine.is_empty().await.unwrap());
    assert!(h.engine.answer_query("the king").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out() {
    let engine = RetrievalEngine::builder()
        .config(EngineConfig::builder().provider_timeout(Duration::from_secs(1)).build().unwrap())
        .embedding_provider(Arc::new(SlowEmbeddingProvider))
        .translation_provider(Arc::new(TaggingTranslator::new(&[Language::Hebrew])))
        .index(Arc::new(InMemoryIndex::new()))
        .build()
        .unwrap();

    let err = engine.index_document(hebrew("d1", "מכתב")).await.unwrap_err();
    assert!(matches!(err, RagError::Timeout { ref operation, .. } if operation == "embedding"));
    assert!(engine.is_empty().await.unwrap());
}

#[tokio::test]
async fn builder_requires_every_collaborator() {
    let err = RetrievalEngine::builder()
        .config(EngineConfig::default())
        .embedding_provider(Arc::new(ConceptEmbeddingProvider::default()))
        .index(Arc::new(InMemoryIndex::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, RagError::ConfigError(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_partial_documents() {
    let h = Arc::new(harness(EngineConfig::default()));
    let writer = {
        let h = Arc::clone(&h);
        tokio::spawn(async move {
            for i in 0..50 {
                let text = format!("מכתב {i}\n\nלחם {i}\n\nנהר {i}");
                h.engine.index_document(hebrew("shared", &text)).await.unwrap();
            }
        })
    };

    for _ in 0..200 {
        let snapshot = h.engine.index().snapshot().await.unwrap();
        for doc in snapshot.iter() {
            assert_eq!(doc.units.len(), 3);
            let suffix = doc.units[0].text.split(' ').nth(1).unwrap().to_string();
            assert!(doc.units.iter().all(|u| u.text.ends_with(&suffix)));
        }
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    assert_eq!(h.engine.list_documents().await.unwrap().len(), 1);
}

#[tokio::test]
async fn file_index_answers_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    {
        let index = Arc::new(FileIndex::open(&path).await.unwrap());
        let h = harness_with(EngineConfig::default(), index);
        h.engine.index_document(hebrew("d1", HEBREW_DOC)).await.unwrap();
    }

    let index = Arc::new(FileIndex::open(&path).await.unwrap());
    let h = harness_with(EngineConfig::default(), index);
    let answer = h.engine.answer_query("who wrote the letter?").await.unwrap().unwrap();
    assert_eq!(answer.document_id, "d1");
    assert_eq!(answer.position, 1);
}
