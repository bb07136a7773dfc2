//! Key rotation and sliding-window rate limiting for pools of API keys.
//!
//! [`KeyRegistry`] hands out keys in round-robin order, optionally skipping keys
//! that already reached a usage limit within a trailing window. Dispensing a key
//! and using it are separate steps: callers report real usage with
//! [`KeyRegistry::report_usage`].
//!
//! ```
//! use key_rotator::{KeyRegistry, RateLimit};
//!
//! let registry = KeyRegistry::from_keys(["key-a", "key-b"]).unwrap();
//! let limit = Some(RateLimit::per_secs(60, 100));
//!
//! let key = registry.next_key(limit).unwrap();
//! registry.report_usage(key.as_str()).unwrap();
//! assert_eq!(registry.usage_snapshot().unwrap()[key.as_str()], 1);
//! ```
//!
//! The `key-rotator` binary serves the same registry over HTTP.

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod key;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod registry;
pub mod state;
pub mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RegistryError;
pub use key::ApiKey;
pub use rate_limit::RateLimit;
pub use registry::KeyRegistry;
