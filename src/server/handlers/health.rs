use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Hello from the relay backend!" }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend_reachable = state.llm.health_check().await;
    let document = state.index.current().map(|index| index.summary());

    Json(json!({
        "status": "ok",
        "backend": state.llm.provider_name(),
        "backend_reachable": backend_reachable,
        "document": document
    }))
}
