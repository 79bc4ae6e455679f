use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatOutcome};
use crate::server::relay::{self, Framing};
use crate::state::AppState;

use super::{require_message, MessageQuery};

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// `POST /chat`: one-shot reply, or a raw chunked stream with `"stream": true`.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!("Rejected chat body: {}", rejection);
        ApiError::BadRequest("Invalid request body".to_string())
    })?;
    let message = require_message(body.message)?;

    let request = state
        .llm
        .chat_request(vec![ChatMessage::user(message)])
        .streaming(body.stream);

    match state.llm.send(request).await? {
        ChatOutcome::Complete(reply) => Ok(Json(json!({ "reply": reply })).into_response()),
        ChatOutcome::Streaming(stream) => Ok(relay::stream_response(Framing::Raw, async move {
            Ok::<_, std::convert::Infallible>(stream)
        })),
    }
}

/// `GET /chat-stream?message=`: model reply as server-sent events.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let message = require_message(query.message)?;

    let llm = state.llm.clone();
    let request = llm
        .chat_request(vec![ChatMessage::user(message)])
        .streaming(true);

    Ok(relay::stream_response(Framing::Sse, async move {
        llm.stream_chat(request).await
    }))
}
