use serde::{Deserialize, Serialize};

use crate::key::ApiKey;
use crate::rate_limit::RateLimit;

// Query for GET /key and POST /key/acquire
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default)]
pub struct KeyQuery {
    // window in seconds
    pub time_window: Option<u64>,
    pub max_uses: Option<u32>,
}

impl KeyQuery {
    // Falls back to `default`; only one of the two parameters is an error
    pub fn limit(&self, default: Option<RateLimit>) -> Result<Option<RateLimit>, String> {
        match (self.time_window, self.max_uses) {
            (Some(window), Some(max_uses)) => Ok(Some(RateLimit::per_secs(window, max_uses))),
            (None, None) => Ok(default),
            _ => Err("time_window and max_uses must be given together".to_string()),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct KeyResponse {
    pub key: ApiKey,
}

// Body of POST /hit
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HitRequest {
    pub key: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default)]
pub struct UsageQuery {
    // windowed counts instead of lifetime totals when set
    pub time_window: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct KeyUsage {
    pub key: ApiKey,
    pub count: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UsageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<u64>,
    pub usage: Vec<KeyUsage>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct KeysResponse {
    pub keys: Vec<ApiKey>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReloadResponse {
    pub keys: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            time_window: None,
            max_uses: None,
            retry_after: None,
        }
    }
}
