use std::sync::Arc;

use crate::config::KeySource;
use crate::rate_limit::RateLimit;
use crate::registry::KeyRegistry;

// app's shared state
pub struct AppState {
    pub registry: Arc<KeyRegistry>,
    pub default_limit: Option<RateLimit>, // used when a request carries no limit
    pub key_source: KeySource,            // re-read on POST /reload
}

impl AppState {
    pub fn new(registry: Arc<KeyRegistry>) -> Self {
        Self {
            registry,
            default_limit: None,
            key_source: KeySource::default(),
        }
    }

    pub fn with_default_limit(mut self, limit: Option<RateLimit>) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_key_source(mut self, source: KeySource) -> Self {
        self.key_source = source;
        self
    }
}
