use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;

use crate::core::errors::ApiError;
use crate::server::relay::{self, Framing};
use crate::state::AppState;

use super::{require_message, MessageQuery};

/// `GET /rag-chat?message=`: streamed answer grounded in the uploaded document.
pub async fn rag_chat(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let question = require_message(query.message)?;

    // Pinned for the whole answer even if a new upload lands meanwhile.
    let index = state.index.snapshot()?;
    let chain = state.chain.clone();

    Ok(relay::stream_response(Framing::Sse, async move {
        chain.answer_stream(&index, &question).await
    }))
}
