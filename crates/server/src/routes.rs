//! HTTP routes.
//!
//! ```text
//! GET    /                  system name and welcome message
//! POST   /chat              route one query
//! GET    /config            user settings
//! POST   /config            partial settings update
//! POST   /config/reset      restore default settings
//! GET    /health
//! GET    /agents            agent descriptions and session count
//! GET    /knowledge-bases   collections with stats
//! GET    /sessions/{id}     session history
//! DELETE /sessions/{id}
//! ```

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use concierge_agents::ChatRequest;
use concierge_prompt::SettingsUpdate;
use serde_json::json;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/chat", post(chat))
        .route("/config", get(get_config).post(update_config))
        .route("/config/reset", post(reset_config))
        .route("/health", get(health))
        .route("/agents", get(agents))
        .route("/knowledge-bases", get(knowledge_bases))
        .route("/sessions/{session_id}", get(session_history).delete(delete_session))
        .with_state(state)
}

fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": msg.to_string() }))
}

/// GET /
async fn root(State(state): State<AppState>) -> Response {
    let settings = state.settings.get();
    Json(json!({
        "system_name": settings.system_name,
        "welcome_message": settings.welcome_message,
    }))
    .into_response()
}

/// POST /chat
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            json_error("bad_request", "query must not be empty"),
        )
            .into_response();
    }

    match state.router.handle(req).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            tracing::warn!("chat request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response()
        }
    }
}

/// GET /config
async fn get_config(State(state): State<AppState>) -> Response {
    Json(json!({ "success": true, "config": state.settings.get() })).into_response()
}

/// POST /config
async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Response {
    match state.settings.update(update) {
        Ok(_) => Json(json!({ "success": true, "message": "Configuration saved" })).into_response(),
        Err(e) => {
            tracing::warn!("saving settings failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": format!("Failed to save configuration: {}", e) })),
            )
                .into_response()
        }
    }
}

/// POST /config/reset
async fn reset_config(State(state): State<AppState>) -> Response {
    match state.settings.reset() {
        Ok(_) => Json(json!({ "success": true, "message": "Configuration reset to defaults" }))
            .into_response(),
        Err(e) => {
            tracing::warn!("resetting settings failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": format!("Failed to reset configuration: {}", e) })),
            )
                .into_response()
        }
    }
}

/// GET /health
async fn health(State(state): State<AppState>) -> Response {
    let name = state.settings.get().system_name;
    Json(json!({ "status": "healthy", "message": format!("{name} is running") })).into_response()
}

/// GET /agents
async fn agents(State(state): State<AppState>) -> Response {
    Json(json!({
        "agents": state.router.decision().agent_info(),
        "current_sessions": state.sessions.session_count().await,
    }))
    .into_response()
}

/// GET /knowledge-bases
async fn knowledge_bases(State(state): State<AppState>) -> Response {
    match state.knowledge.stats(None) {
        Ok(stats) => Json(json!({
            "knowledge_bases": stats,
            "rag_enabled": state.settings.is_rag_enabled(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("knowledge base stats failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response()
        }
    }
}

/// GET /sessions/{session_id}
async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.sessions.history(&session_id).await {
        Some(history) => Json(json!({
            "session_id": session_id,
            "conversation_history": history,
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            json_error("not_found", format!("session {session_id} not found")),
        )
            .into_response(),
    }
}

/// DELETE /sessions/{session_id}
async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    if state.sessions.clear_session(&session_id).await {
        Json(json!({ "success": true })).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            json_error("not_found", format!("session {session_id} not found")),
        )
            .into_response()
    }
}
