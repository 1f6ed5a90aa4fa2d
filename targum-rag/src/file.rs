//! Durable retrieval index persisted to a JSON file.
//!
//! [`FileIndex`] behaves like [`InMemoryIndex`](crate::InMemoryIndex) but
//! flushes the whole document set to disk after every mutation. The new set
//! is written to a sibling temporary file and renamed over the index file
//! before it becomes visible to readers, so a failed flush leaves the
//! previous state in place both on disk and in memory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::document::{DocumentSummary, IndexedDocument, UnitHit};
use crate::error::{RagError, Result};
use crate::index::{DEFAULT_PREVIEW_CHARS, DocumentSet, RetrievalIndex};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    dimensions: Option<usize>,
    documents: Vec<&'a IndexedDocument>,
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    dimensions: Option<usize>,
    documents: Vec<IndexedDocument>,
}

fn store_error(message: impl Into<String>) -> RagError {
    RagError::IndexError { backend: "File".to_string(), message: message.into() }
}

/// A retrieval index persisted as a single JSON file.
///
/// # Example
///
/// ```rust,ignore
/// use targum_rag::{FileIndex, RetrievalIndex};
///
/// let index = FileIndex::open("data/index.json").await?;
/// index.add(document).await?; // flushed before this returns
/// ```
#[derive(Debug)]
pub struct FileIndex {
    path: PathBuf,
    documents: RwLock<Arc<DocumentSet>>,
    writer: Mutex<()>,
    preview_chars: usize,
}

impl FileIndex {
    /// Open the index at `path`, loading existing contents.
    ///
    /// A missing file is an empty index; the parent directory is created if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the file cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                store_error(format!("failed to create '{}': {e}", parent.display()))
            })?;
        }

        let set = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: IndexFile = serde_json::from_slice(&bytes).map_err(|e| {
                    store_error(format!("failed to parse '{}': {e}", path.display()))
                })?;
                if file.version != FORMAT_VERSION {
                    return Err(store_error(format!(
                        "'{}' has format version {}, expected {FORMAT_VERSION}",
                        path.display(),
                        file.version
                    )));
                }
                DocumentSet::from_documents(file.dimensions, file.documents)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => DocumentSet::default(),
            Err(e) => return Err(store_error(format!("failed to read '{}': {e}", path.display()))),
        };

        info!(backend = "File", path = %path.display(), document_count = set.len(), "index opened");

        Ok(Self {
            path,
            documents: RwLock::new(Arc::new(set)),
            writer: Mutex::new(()),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        })
    }

    /// Set the preview length used by [`list`](RetrievalIndex::list).
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// The index file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, set: &DocumentSet) -> Result<()> {
        let file = IndexFileRef {
            version: FORMAT_VERSION,
            dimensions: set.dimensions(),
            documents: set.iter().collect(),
        };
        let bytes = serde_json::to_vec(&file)
            .map_err(|e| store_error(format!("failed to serialize index: {e}")))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            error!(backend = "File", path = %tmp.display(), error = %e, "flush failed");
            store_error(format!("failed to write '{}': {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            error!(backend = "File", path = %self.path.display(), error = %e, "flush failed");
            store_error(format!("failed to replace '{}': {e}", self.path.display()))
        })?;

        debug!(backend = "File", bytes = bytes.len(), "index flushed");
        Ok(())
    }

    /// Persist `next` and publish it to readers.
    async fn commit(&self, next: DocumentSet) -> Result<()> {
        self.persist(&next).await?;
        *self.documents.write().await = Arc::new(next);
        Ok(())
    }
}

#[async_trait]
impl RetrievalIndex for FileIndex {
    fn backend(&self) -> &str {
        "File"
    }

    async fn add(&self, document: IndexedDocument) -> Result<()> {
        let _writer = self.writer.lock().await;
        let next = self.snapshot().await?.with_document(document)?;
        self.commit(next).await
    }

    async fn delete(&self, document_id: &str) -> Result<()> {
        let _writer = self.writer.lock().await;
        match self.snapshot().await?.without_document(document_id) {
            Some(next) => self.commit(next).await,
            None => Ok(()),
        }
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self.snapshot().await?.summaries(self.preview_chars))
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<UnitHit>> {
        self.snapshot().await?.nearest(embedding, top_k)
    }

    async fn snapshot(&self) -> Result<Arc<DocumentSet>> {
        Ok(Arc::clone(&*self.documents.read().await))
    }

    async fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let next = self.snapshot().await?.cleared();
        self.commit(next).await
    }
}
