//! In-memory vector index and the process-wide handle that owns it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use super::error::RagError;

/// A chunk of the ingested document together with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub content: String,
    /// Character offset of the chunk in the source document.
    pub source_offset: usize,
    pub embedding: Vec<f32>,
}

/// Immutable snapshot of one ingested document.
#[derive(Debug)]
pub struct VectorIndex {
    source: String,
    chunks: Vec<DocumentChunk>,
    /// File the index was built from, when it came from disk.
    stored_path: Option<PathBuf>,
}

impl VectorIndex {
    pub fn new(source: impl Into<String>, chunks: Vec<DocumentChunk>) -> Self {
        Self {
            source: source.into(),
            chunks,
            stored_path: None,
        }
    }

    pub fn with_stored_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stored_path = Some(path.into());
        self
    }

    pub fn stored_path(&self) -> Option<&Path> {
        self.stored_path.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            source: self.source.clone(),
            chunks: self.chunks.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub source: String,
    pub chunks: usize,
}

/// Holds the latest successfully ingested index.
///
/// Readers take an `Arc` snapshot and keep using it even if a new document
/// is ingested meanwhile; writers swap the whole snapshot.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<VectorIndex>>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<VectorIndex>> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn snapshot(&self) -> Result<Arc<VectorIndex>, RagError> {
        self.current().ok_or(RagError::IndexUnavailable)
    }

    /// Installs `index`, returning the one it replaced.
    pub fn replace(&self, index: VectorIndex) -> Option<Arc<VectorIndex>> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        guard.replace(Arc::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(source: &str, n: usize) -> VectorIndex {
        let chunks = (0..n)
            .map(|i| DocumentChunk {
                content: format!("{} chunk {}", source, i),
                source_offset: i * 800,
                embedding: vec![i as f32, 1.0],
            })
            .collect();
        VectorIndex::new(source, chunks)
    }

    #[test]
    fn snapshot_before_ingest_is_unavailable() {
        let handle = IndexHandle::new();
        assert!(matches!(handle.snapshot(), Err(RagError::IndexUnavailable)));
        assert!(handle.current().is_none());
    }

    #[test]
    fn replace_swaps_whole_index() {
        let handle = IndexHandle::new();
        assert!(handle.replace(index_of("first.txt", 3)).is_none());

        let held = handle.snapshot().unwrap();
        let previous = handle.replace(index_of("second.txt", 2)).unwrap();

        assert_eq!(previous.source(), "first.txt");
        // A reader that took its snapshot earlier still sees the complete old index.
        assert_eq!(held.len(), 3);
        let now = handle.snapshot().unwrap();
        assert_eq!(now.source(), "second.txt");
        assert!(now.chunks().iter().all(|c| c.content.starts_with("second.txt")));
    }

    #[test]
    fn summary_reports_source_and_size() {
        let index = index_of("notes.txt", 4);
        assert_eq!(
            index.summary(),
            IndexSummary {
                source: "notes.txt".to_string(),
                chunks: 4
            }
        );
    }
}
