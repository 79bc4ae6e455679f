use serde::Serialize;

use crate::llm::LlmService;
use crate::vector_math::rank_descending_by_cosine;

use super::error::RagError;
use super::index::VectorIndex;

/// Separator placed between retrieved chunks in the context block.
pub const CONTEXT_DELIMITER: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub source_offset: usize,
    pub score: f32,
}

#[derive(Clone)]
pub struct Retriever {
    llm: LlmService,
}

impl Retriever {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    /// At most `k` chunks, most similar first. Equal scores keep document order.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        if k == 0 || index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.llm.embed(query).await.map_err(RagError::Embedding)?;
        let candidates: Vec<&[f32]> = index
            .chunks()
            .iter()
            .map(|chunk| chunk.embedding.as_slice())
            .collect();
        let ranked = rank_descending_by_cosine(&query_embedding, &candidates)?;

        let chunks = index.chunks();
        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| RetrievedChunk {
                content: chunks[idx].content.clone(),
                source_offset: chunks[idx].source_offset,
                score,
            })
            .collect())
    }
}

/// Concatenates chunk contents in rank order.
pub fn join_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}
