use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{KeyUsage, KeysResponse, UsageQuery, UsageResponse};
use crate::state::AppState;

// GET /usage - lifetime counts, or counts within ?time_window=<secs>
pub async fn usage_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    let usage = state
        .registry
        .usage_report(query.time_window.map(Duration::from_secs))?
        .into_iter()
        .map(|(key, count)| KeyUsage { key, count })
        .collect();

    Ok(Json(UsageResponse {
        time_window: query.time_window,
        usage,
    }))
}

// GET /keys
pub async fn keys_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<KeysResponse>, ApiError> {
    REQUEST_TOTAL.inc();
    let keys = state.registry.configured_keys()?;
    Ok(Json(KeysResponse { keys }))
}
