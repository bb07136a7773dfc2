use std::time::Duration;

/// Errors returned by the key registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No keys were supplied at initialization
    #[error("Configuration error: at least one API key is required")]
    Configuration,

    /// Operation attempted before `initialize`
    #[error("Key registry is not initialized")]
    NotInitialized,

    /// Usage reported for a key outside the configured set
    #[error("Unknown API key: {fingerprint}")]
    UnknownKey { fingerprint: String },

    /// Every configured key has reached its limit within the window
    #[error("Rate limit exceeded: every key has {max_uses} uses within {time_window:?}")]
    RateLimitExceeded {
        time_window: Duration,
        max_uses: u32,
        /// Time until at least one key drops below the limit.
        /// `None` when no key can ever satisfy the limit (max_uses = 0).
        retry_after: Option<Duration>,
    },
}

impl RegistryError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_mentions_limit() {
        let err = RegistryError::RateLimitExceeded {
            time_window: Duration::from_secs(5),
            max_uses: 2,
            retry_after: Some(Duration::from_secs(3)),
        };
        assert!(err.to_string().contains("2 uses within 5s"));
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_other_errors_have_no_retry_hint() {
        assert_eq!(RegistryError::NotInitialized.retry_after(), None);
        assert!(!RegistryError::Configuration.is_rate_limited());
    }
}
