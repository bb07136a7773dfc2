use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use std::time::Duration;

use crate::error::RegistryError;
use crate::models::ErrorResponse;

// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
    pub retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(message),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        match err {
            RegistryError::Configuration => Self::new(StatusCode::UNPROCESSABLE_ENTITY, message),
            RegistryError::NotInitialized => Self::new(StatusCode::SERVICE_UNAVAILABLE, message),
            RegistryError::UnknownKey { .. } => Self::new(StatusCode::NOT_FOUND, message),
            RegistryError::RateLimitExceeded {
                time_window,
                max_uses,
                retry_after,
            } => {
                let mut api = Self::new(StatusCode::TOO_MANY_REQUESTS, message);
                api.body.time_window = Some(time_window.as_secs());
                api.body.max_uses = Some(max_uses);
                api.body.retry_after = retry_after.map(|d| d.as_secs_f64());
                api.retry_after = retry_after;
                api
            }
        }
    }
}

// Retry-After carries whole seconds, round up
fn retry_after_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(d) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(d)));
        }
        response
    }
}
