//! HTTP API for Concierge.
//!
//! An axum router over a shared [`ChatRouter`](concierge_agents::ChatRouter),
//! the user settings store and the knowledge bases.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::{open_knowledge, AppState};

use concierge_core::{AppError, AppResult};
use tokio::net::TcpListener;

/// Serve the API on `bind` until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> AppResult<()> {
    let router = build_router(state);

    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", bind, e)))?;

    tracing::info!(%bind, "Concierge listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Other(format!("Server error: {}", e)))?;

    tracing::info!("Concierge shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
