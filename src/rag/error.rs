use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("failed to read document {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("embedding failed: {0}")]
    Embedding(#[source] LlmError),
    #[error("answer generation failed: {0}")]
    Generation(#[source] LlmError),
    #[error("document contains no text to index")]
    EmptyDocument,
    #[error("No document has been uploaded")]
    IndexUnavailable,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
