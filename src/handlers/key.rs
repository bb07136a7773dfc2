use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;

use super::error::ApiError;
use crate::error::RegistryError;
use crate::metrics::{KEYS_DISPENSED, RATE_LIMIT_REJECTIONS, REQUEST_TOTAL, USAGE_REPORTS};
use crate::models::{KeyQuery, KeyResponse};
use crate::state::AppState;

fn count_rejection(err: &RegistryError) {
    if err.is_rate_limited() {
        RATE_LIMIT_REJECTIONS.inc();
    }
}

// GET /key - next key in rotation, usage not recorded
pub async fn key_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<KeyResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    let limit = query
        .limit(state.default_limit)
        .map_err(ApiError::bad_request)?;
    let key = state.registry.next_key(limit).inspect_err(count_rejection)?;

    KEYS_DISPENSED
        .with_label_values(&[key.fingerprint().as_str()])
        .inc();
    Ok(Json(KeyResponse { key }))
}

// POST /key/acquire - next key with its use recorded in the same step
pub async fn acquire_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<KeyResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    let limit = query
        .limit(state.default_limit)
        .map_err(ApiError::bad_request)?;
    let key = state.registry.acquire(limit).inspect_err(count_rejection)?;

    let fingerprint = key.fingerprint();
    KEYS_DISPENSED.with_label_values(&[fingerprint.as_str()]).inc();
    USAGE_REPORTS.with_label_values(&[fingerprint.as_str()]).inc();
    Ok(Json(KeyResponse { key }))
}
