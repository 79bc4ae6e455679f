use async_trait::async_trait;

use super::error::LlmError;
use super::stream::TokenStream;
use super::types::ChatRequest;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "ollama", "openai")
    fn name(&self) -> &str;

    /// check if the provider is reachable
    async fn health_check(&self) -> bool;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// chat completion (streaming); resolves once the backend accepted the request
    async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, LlmError>;

    /// embed a single text with the given embedding model
    async fn embed(&self, input: &str, model_id: &str) -> Result<Vec<f32>, LlmError>;
}
