use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = if state.registry.is_ready() {
        "healthy"
    } else {
        "uninitialized"
    };
    Json(serde_json::json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
