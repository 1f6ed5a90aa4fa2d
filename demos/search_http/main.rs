//! # Search over HTTP providers
//!
//! Indexes the `.txt` files given on the command line into a persistent
//! `FileIndex`, then answers questions read from stdin until `exit`.
//!
//! Requires an OpenAI-compatible embeddings server and a LibreTranslate
//! server:
//!
//! ```text
//! TARGUM_EMBEDDING_URL=http://localhost:8080 \
//! TARGUM_TRANSLATE_URL=http://localhost:5000 \
//! cargo run -p targum-demos --features http --example search_http -- doc1.txt doc2.txt
//! ```

use std::io::{BufRead, Write};
use std::sync::Arc;

use targum_demos::init_tracing;
use targum_rag::{
    DocumentSource, EngineConfig, FileIndex, HttpEmbeddingProvider, Language,
    LibreTranslateProvider, RetrievalEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let index_path =
        std::env::var("TARGUM_INDEX_PATH").unwrap_or_else(|_| "targum-index.json".to_string());

    let engine = RetrievalEngine::builder()
        .config(EngineConfig::default())
        .embedding_provider(Arc::new(HttpEmbeddingProvider::from_env()?))
        .translation_provider(Arc::new(LibreTranslateProvider::from_env()?))
        .index(Arc::new(FileIndex::open(&index_path).await?))
        .build()?;

    // Fail at startup rather than on the first answer.
    engine.verify_languages(&[Language::Hebrew, Language::Yiddish]).await?;

    for path in std::env::args().skip(1) {
        let bytes = tokio::fs::read(&path).await?;
        let source = DocumentSource::new(path.clone(), bytes).with_id(&path);
        let report = engine.index_document(source).await?;
        println!("Indexed {path} as language {} ({} units)", report.language, report.unit_count);
    }

    if engine.is_empty().await? {
        println!("Index at {index_path} is empty; pass .txt files to index.");
        return Ok(());
    }

    let stdin = std::io::stdin();
    loop {
        print!("Ask a question in English (or 'exit'): ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        match engine.answer_query(question).await? {
            Some(answer) => {
                println!(
                    "\nMatched document: {} (language {}, score {})",
                    answer.label,
                    answer.language,
                    answer.display_score()
                );
                println!("\n--- English Translation ---\n{}\n", answer.passage);
            }
            None => println!("No relevant documents found.\n"),
        }
    }

    Ok(())
}
