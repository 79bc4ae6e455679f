use std::path::Path;

use crate::core::config::RagConfig;
use crate::llm::LlmService;

use super::chunker::split_text;
use super::error::RagError;
use super::index::{DocumentChunk, VectorIndex};

/// Load → split → embed → index.
#[derive(Clone)]
pub struct DocumentPipeline {
    llm: LlmService,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentPipeline {
    pub fn new(llm: LlmService, config: &RagConfig) -> Self {
        Self {
            llm,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    /// Builds a fresh index from the UTF-8 text file at `path`.
    pub async fn ingest(&self, path: &Path) -> Result<VectorIndex, RagError> {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.ingest_named(path, &source).await
    }

    /// Like [`ingest`](Self::ingest), but records `source` as the document name.
    pub async fn ingest_named(&self, path: &Path, source: &str) -> Result<VectorIndex, RagError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RagError::Load {
                path: path.to_path_buf(),
                source,
            })?;

        let index = self.ingest_text(&text, source).await?;
        Ok(index.with_stored_path(path))
    }

    /// Any chunk that fails to embed aborts the whole ingestion.
    pub async fn ingest_text(&self, text: &str, source: &str) -> Result<VectorIndex, RagError> {
        let pieces = split_text(text, self.chunk_size, self.chunk_overlap);
        if pieces.is_empty() {
            return Err(RagError::EmptyDocument);
        }

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut dimensions: Option<usize> = None;
        for piece in pieces {
            let embedding = self.llm.embed(&piece.text).await.map_err(|e| {
                tracing::error!(
                    "Embedding chunk {} of {} failed: {}",
                    piece.chunk_index,
                    source,
                    e
                );
                RagError::Embedding(e)
            })?;

            match dimensions {
                Some(expected) if expected != embedding.len() => {
                    return Err(RagError::DimensionMismatch {
                        expected,
                        actual: embedding.len(),
                    });
                }
                None => dimensions = Some(embedding.len()),
                _ => {}
            }

            chunks.push(DocumentChunk {
                content: piece.text,
                source_offset: piece.start_offset,
                embedding,
            });
        }

        tracing::info!(
            "Indexed {} chunks from {} ({} dimensions)",
            chunks.len(),
            source,
            dimensions.unwrap_or(0)
        );
        Ok(VectorIndex::new(source, chunks))
    }
}
