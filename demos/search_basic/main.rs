//! # Search Basic Example
//!
//! Indexes two Hebrew documents and one English document, then answers
//! English questions with a translated context window.
//!
//! Uses `InMemoryIndex`, a trigram `EmbeddingProvider`, and a glossary
//! `TranslationProvider`, so it runs with **zero API keys**. Hebrew documents
//! are translated at index time so the English questions share a vector
//! space with the stored units.
//!
//! Run: `cargo run -p targum-demos --example search_basic`

use std::sync::Arc;

use targum_demos::{GlossaryTranslator, TrigramEmbeddingProvider, init_tracing};
use targum_rag::{
    DocumentSource, EngineConfig, InMemoryIndex, Language, RetrievalEngine, TranslationStage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // -- 1. Configure the engine ------------------------------------------
    let config = EngineConfig::builder().translation_stage(TranslationStage::Index).build()?;

    let engine = RetrievalEngine::builder()
        .config(config)
        .embedding_provider(Arc::new(TrigramEmbeddingProvider::new(256)))
        .translation_provider(Arc::new(GlossaryTranslator::default()))
        .index(Arc::new(InMemoryIndex::new()))
        .build()?;

    engine.verify_languages(&[Language::Hebrew, Language::Yiddish]).await?;

    // -- 2. Index documents -----------------------------------------------
    let uploads = [
        DocumentSource::new(
            "sinai.txt",
            "התורה ניתנה בסיני.\n\nהמכתב נכתב על ידי הרב.\n\nהלחם נאפה בבוקר.",
        ),
        DocumentSource::new("city.txt", "המלך בנה ארמון בעיר.\n\nהנהר זורם לים."),
        DocumentSource::new(
            "notes.txt",
            "Meeting notes.\n\nThe committee discussed the archive.\n\nNothing else was decided.",
        )
        .with_language(Language::English),
    ];

    for upload in uploads {
        let report = engine.index_document(upload).await?;
        println!("  {} [{}] → {} unit(s)", report.document_id, report.language, report.unit_count);
    }

    for summary in engine.list_documents().await? {
        println!("  {} {:<10} {}", summary.id, summary.label, summary.preview);
    }

    // -- 3. Ask questions -------------------------------------------------
    let questions = ["who wrote the letter?", "what did the king build?", "quantum chromodynamics"];

    for question in questions {
        println!("\nQuestion: \"{question}\"");
        match engine.answer_query(question).await? {
            Some(answer) => {
                println!("Relevant document: {} (score {})", answer.label, answer.display_score());
                println!("{}", answer.passage);
            }
            None => println!("  (no relevant documents found)"),
        }
    }

    Ok(())
}
