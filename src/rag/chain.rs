//! Retrieval-augmented answer chain.

use crate::core::config::RagConfig;
use crate::llm::{ChatMessage, ChatRequest, LlmService, TokenStream};

use super::error::RagError;
use super::index::VectorIndex;
use super::retriever::{join_context, Retriever};

/// Bumped whenever the template text changes.
pub const RAG_PROMPT_VERSION: &str = "1";

pub const RAG_PROMPT_TEMPLATE: &str = "Answer the question based only on the following context:

{context}

Question: {question}

Answer:";

/// Fills `{context}` and `{question}` in one pass, so placeholder-looking
/// text inside either value is left alone.
pub fn render_prompt(context: &str, question: &str) -> String {
    let mut out = String::with_capacity(RAG_PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = RAG_PROMPT_TEMPLATE;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Output parser for one-shot answers.
fn parse_output(raw: &str) -> String {
    raw.trim().to_string()
}

#[derive(Clone)]
pub struct AnswerChain {
    retriever: Retriever,
    llm: LlmService,
    top_k: usize,
}

impl AnswerChain {
    pub fn new(llm: LlmService, config: &RagConfig) -> Self {
        Self {
            retriever: Retriever::new(llm.clone()),
            llm,
            top_k: config.top_k,
        }
    }

    async fn build_request(
        &self,
        index: &VectorIndex,
        question: &str,
        stream: bool,
    ) -> Result<ChatRequest, RagError> {
        let retrieved = self.retriever.retrieve(index, question, self.top_k).await?;
        tracing::debug!(
            "Retrieved {} chunks from {} (prompt v{})",
            retrieved.len(),
            index.source(),
            RAG_PROMPT_VERSION
        );

        let prompt = render_prompt(&join_context(&retrieved), question);
        Ok(self
            .llm
            .chat_request(vec![ChatMessage::user(prompt)])
            .streaming(stream))
    }

    pub async fn answer(&self, index: &VectorIndex, question: &str) -> Result<String, RagError> {
        let request = self.build_request(index, question, false).await?;
        let reply = self.llm.chat(request).await.map_err(RagError::Generation)?;
        Ok(parse_output(&reply))
    }

    pub async fn answer_stream(
        &self,
        index: &VectorIndex,
        question: &str,
    ) -> Result<TokenStream, RagError> {
        let request = self.build_request(index, question, true).await?;
        self.llm
            .stream_chat(request)
            .await
            .map_err(RagError::Generation)
    }
}
