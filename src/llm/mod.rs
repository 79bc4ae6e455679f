pub mod error;
mod lines;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod service;
pub mod stream;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::LlmError;
pub use provider::LlmProvider;
pub use service::LlmService;
pub use stream::{FragmentSender, TokenStream};
pub use types::{ChatMessage, ChatOutcome, ChatRequest, Role, TokenFragment};
