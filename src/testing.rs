//! Test doubles shared by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::config::LlmConfig;
use crate::llm::{ChatRequest, LlmError, LlmProvider, LlmService, TokenFragment, TokenStream};

type EmbedFn = dyn Fn(&str) -> Result<Vec<f32>, LlmError> + Send + Sync;

/// Keyword-count embedding: one dimension per keyword plus a constant bias.
pub fn keyword_embedding(keywords: &'static [&'static str]) -> Arc<EmbedFn> {
    Arc::new(move |text: &str| {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = keywords
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        vector.push(0.01);
        Ok(vector)
    })
}

pub struct MockProvider {
    pub fragments: Vec<Result<String, LlmError>>,
    pub embed_fn: Arc<EmbedFn>,
    pub requests: Mutex<Vec<ChatRequest>>,
    pub embed_calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| Ok(s.to_string())).collect(),
            embed_fn: keyword_embedding(&["apple", "banana", "cherry"]),
            requests: Mutex::new(Vec::new()),
            embed_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_embed_fn(mut self, embed_fn: Arc<EmbedFn>) -> Self {
        self.embed_fn = embed_fn;
        self
    }

    pub fn with_results(mut self, fragments: Vec<Result<String, LlmError>>) -> Self {
        self.fragments = fragments;
        self
    }

    pub fn into_service(self) -> (Arc<MockProvider>, LlmService) {
        let provider = Arc::new(self);
        let service = LlmService::new(provider.clone(), LlmConfig::default());
        (provider, service)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.messages.last().map(|m| m.content.clone()))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        let mut reply = String::new();
        for fragment in &self.fragments {
            reply.push_str(&fragment.clone()?);
        }
        Ok(reply)
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, LlmError> {
        self.requests.lock().unwrap().push(request);
        Ok(TokenStream::from_results(
            self.fragments
                .iter()
                .cloned()
                .map(|r| r.map(TokenFragment::new)),
        ))
    }

    async fn embed(&self, input: &str, _model_id: &str) -> Result<Vec<f32>, LlmError> {
        self.embed_calls.lock().unwrap().push(input.to_string());
        (self.embed_fn)(input)
    }
}
