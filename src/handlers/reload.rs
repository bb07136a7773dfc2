use axum::{Json, extract::State};
use std::sync::Arc;
use tracing::{error, info};

use super::error::ApiError;
use crate::metrics::{CONFIGURED_KEYS, REQUEST_TOTAL};
use crate::models::ReloadResponse;
use crate::state::AppState;

// POST /reload - re-read keys and re-initialize, resetting cursor and usage
pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    let source = state.key_source.clone();
    let keys = tokio::task::spawn_blocking(move || source.collect())
        .await
        .map_err(|e| ApiError::internal(format!("Reload task failed: {e}")))?
        .map_err(|e| {
            error!("Failed to read keys: {}", e);
            ApiError::internal(format!("Failed to read keys: {e}"))
        })?;

    state.registry.initialize(keys)?;

    let count = state.registry.configured_keys()?.len();
    CONFIGURED_KEYS.set(count as f64);
    info!("Reloaded {} keys", count);

    Ok(Json(ReloadResponse { keys: count }))
}
