use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::error::ApiError;
use crate::key::fingerprint;
use crate::metrics::{REQUEST_TOTAL, USAGE_REPORTS};
use crate::models::HitRequest;
use crate::state::AppState;

// POST /hit - report that a dispensed key was actually used
pub async fn hit_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HitRequest>,
) -> Result<StatusCode, ApiError> {
    REQUEST_TOTAL.inc();

    state.registry.report_usage(&payload.key)?;

    USAGE_REPORTS
        .with_label_values(&[fingerprint(&payload.key).as_str()])
        .inc();
    Ok(StatusCode::NO_CONTENT)
}
