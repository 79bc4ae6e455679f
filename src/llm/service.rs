use std::sync::Arc;

use crate::core::config::{LlmConfig, ProviderKind};

use super::error::LlmError;
use super::ollama::OllamaProvider;
use super::openai::OpenAiCompatProvider;
use super::provider::LlmProvider;
use super::stream::TokenStream;
use super::types::{ChatMessage, ChatOutcome, ChatRequest};

/// Model client used by the handlers and the answer chain.
///
/// Every call opens its own backend request. Nothing is retried and no
/// deadline is applied; callers that need one wrap the future themselves.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, config: LlmConfig) -> Self {
        Self { provider, config }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let provider: Arc<dyn LlmProvider> = match config.provider {
            ProviderKind::Ollama => Arc::new(OllamaProvider::new(config.base_url.clone())),
            ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::new(config.base_url.clone())),
        };
        Self::new(provider, config.clone())
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }

    /// Request for the configured chat model with configured sampling options.
    pub fn chat_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest::new(self.config.chat_model.clone(), messages).with_config(&self.config)
    }

    /// Dispatches on `request.stream`.
    pub async fn send(&self, request: ChatRequest) -> Result<ChatOutcome, LlmError> {
        if request.stream {
            self.stream_chat(request).await.map(ChatOutcome::Streaming)
        } else {
            self.chat(request).await.map(ChatOutcome::Complete)
        }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let model = request.model.clone();
        self.provider.chat(request).await.map_err(|e| {
            tracing::warn!("{} chat with model {} failed: {}", self.provider.name(), model, e);
            e
        })
    }

    pub async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, LlmError> {
        let model = request.model.clone();
        self.provider.stream_chat(request).await.map_err(|e| {
            tracing::warn!(
                "{} stream with model {} failed to open: {}",
                self.provider.name(),
                model,
                e
            );
            e
        })
    }

    /// Embeds one text with the configured embedding model.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.provider.embed(text, &self.config.embedding_model).await
    }
}
