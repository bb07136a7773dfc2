mod error;
mod health;
mod hit;
mod key;
mod metrics;
mod reload;
mod usage;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub use error::ApiError;
pub use health::health_handler;
pub use hit::hit_handler;
pub use key::{acquire_handler, key_handler};
pub use metrics::metrics_handler;
pub use reload::reload_handler;
pub use usage::{keys_handler, usage_handler};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/key", get(key_handler))
        .route("/key/acquire", post(acquire_handler))
        .route("/hit", post(hit_handler))
        .route("/usage", get(usage_handler))
        .route("/keys", get(keys_handler))
        .route("/reload", post(reload_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
