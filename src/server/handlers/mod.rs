pub mod chat;
pub mod health;
pub mod rag;
pub mod upload;

use serde::Deserialize;

use crate::core::errors::ApiError;

pub const MESSAGE_REQUIRED: &str = "Message is required";

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    #[serde(default)]
    pub message: Option<String>,
}

/// Rejects a missing or blank message before any backend work starts.
pub(crate) fn require_message(message: Option<String>) -> Result<String, ApiError> {
    match message {
        Some(message) if !message.trim().is_empty() => Ok(message),
        _ => Err(ApiError::BadRequest(MESSAGE_REQUIRED.to_string())),
    }
}
