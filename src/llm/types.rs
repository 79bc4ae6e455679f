use serde::{Deserialize, Serialize};

use crate::core::config::LlmConfig;

use super::stream::TokenStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_config(mut self, config: &LlmConfig) -> Self {
        self.temperature = config.temperature.or(self.temperature);
        self.max_tokens = config.max_tokens.or(self.max_tokens);
        self
    }
}

/// One incremental piece of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFragment {
    pub text: String,
}

impl TokenFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Result of a chat call: the whole reply, or the live fragment sequence.
pub enum ChatOutcome {
    Complete(String),
    Streaming(TokenStream),
}
