use super::BridgeAppState;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

pub fn create_health_router(state: Arc<BridgeAppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(state)
}

/// Liveness payload.
pub fn liveness() -> Value {
    json!({
        "status": "ok",
        "service": "tunebridge",
        "version": env!("CARGO_PKG_VERSION"),
    })
}

async fn health() -> Json<Value> {
    Json(liveness())
}

/// GET / - control page when configured, liveness otherwise
async fn index(State(state): State<Arc<BridgeAppState>>) -> Response {
    if let Some(path) = &state.static_page {
        match tokio::fs::read_to_string(path).await {
            Ok(page) => return Html(page).into_response(),
            Err(e) => warn!(path = %path.display(), error = %e, "Static page unreadable"),
        }
    }
    Json(liveness()).into_response()
}
