use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use relay_backend::core::logging;
use relay_backend::server;
use relay_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().context("Failed to initialize application state")?;
    logging::init(&state.paths);

    let server_config = &state.config.server;
    let bind_addr = format!("{}:{}", server_config.host, server_config.port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Listening on {} (backend: {} at {})",
        addr,
        state.llm.provider_name(),
        state.config.llm.base_url
    );

    if !state.llm.health_check().await {
        tracing::warn!(
            "Model backend at {} is not reachable yet; requests will fail until it is",
            state.config.llm.base_url
        );
    }

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
