use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{RegistryError, Result};
use crate::key::{ApiKey, fingerprint};
use crate::rate_limit::{RateLimit, UsageHistory};

// Keys plus rotation and usage state, present only once initialized
#[derive(Debug)]
struct Rotation {
    keys: Vec<ApiKey>,
    positions: HashMap<ApiKey, usize>,
    histories: Vec<UsageHistory>,
    cursor: usize,
    // largest window any caller asked for, bounds what prune_expired keeps
    largest_window: Option<Duration>,
}

impl Rotation {
    fn new(keys: Vec<ApiKey>) -> Self {
        let positions: HashMap<ApiKey, usize> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i))
            .collect();
        let histories = vec![UsageHistory::new(); keys.len()];

        Self {
            keys,
            positions,
            histories,
            cursor: 0,
            largest_window: None,
        }
    }

    fn note_window(&mut self, window: Duration) {
        if self.largest_window.is_none_or(|w| window > w) {
            self.largest_window = Some(window);
        }
    }

    fn select(&mut self, now: DateTime<Utc>, limit: Option<&RateLimit>) -> Result<usize> {
        let len = self.keys.len();

        let Some(limit) = limit else {
            let idx = self.cursor;
            self.cursor = (idx + 1) % len;
            return Ok(idx);
        };

        self.note_window(limit.time_window);

        for step in 0..len {
            let idx = (self.cursor + step) % len;
            if self.histories[idx].allows(now, limit) {
                self.cursor = (idx + 1) % len;
                return Ok(idx);
            }
        }

        let retry_after = self
            .histories
            .iter()
            .filter_map(|h| h.available_at(now, limit))
            .min()
            .map(|at| (at - now).to_std().unwrap_or_default());

        Err(RegistryError::RateLimitExceeded {
            time_window: limit.time_window,
            max_uses: limit.max_uses,
            retry_after,
        })
    }

    fn record(&mut self, key: &str, at: DateTime<Utc>) -> Result<()> {
        let idx = *self
            .positions
            .get(key)
            .ok_or_else(|| RegistryError::UnknownKey {
                fingerprint: fingerprint(key),
            })?;
        self.histories[idx].record(at);
        Ok(())
    }

    fn count(&mut self, idx: usize, now: DateTime<Utc>, window: Option<Duration>) -> u64 {
        match window {
            Some(window) => {
                self.note_window(window);
                self.histories[idx].count_within(now, window) as u64
            }
            None => self.histories[idx].total(),
        }
    }
}

#[derive(Debug)]
enum RegistryState {
    Uninitialized,
    Ready(Rotation),
}

/// Rotates through a fixed set of API keys and tracks how often each was used.
///
/// History is pruned back to the larger of the widest window requested so far
/// and the retention floor set with [`KeyRegistry::with_retention`]. A later
/// request for a wider window than both only sees uses that survived pruning.
#[derive(Debug)]
pub struct KeyRegistry {
    // one lock so the window check and cursor advance are atomic
    state: Mutex<RegistryState>,
    clock: Arc<dyn Clock>,
    retention: Option<Duration>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRegistry {
    // Uninitialized registry on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(RegistryState::Uninitialized),
            clock,
            retention: None,
        }
    }

    /// Keep at least `floor` of usage history when pruning
    pub fn with_retention(mut self, floor: Duration) -> Self {
        self.retention = Some(floor);
        self
    }

    // Registry initialized with `keys`, on the system clock
    pub fn from_keys<I, K>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<ApiKey>,
    {
        let registry = Self::new();
        registry.initialize(keys)?;
        Ok(registry)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // every mutation completes before anything that can panic
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_ready<T>(&self, f: impl FnOnce(&mut Rotation) -> Result<T>) -> Result<T> {
        match &mut *self.lock() {
            RegistryState::Ready(rotation) => f(rotation),
            RegistryState::Uninitialized => Err(RegistryError::NotInitialized),
        }
    }

    /// Load the key set, replacing any previous keys, cursor and usage history.
    /// An empty set is rejected and leaves the current state untouched.
    pub fn initialize<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<ApiKey>,
    {
        let mut unique: Vec<ApiKey> = Vec::new();
        for key in keys.into_iter().map(Into::into) {
            if unique.contains(&key) {
                warn!(key = %key.fingerprint(), "ignoring duplicate key");
                continue;
            }
            unique.push(key);
        }
        if unique.is_empty() {
            return Err(RegistryError::Configuration);
        }

        info!("Key registry initialized with {} keys", unique.len());
        for (i, key) in unique.iter().enumerate() {
            debug!(position = i + 1, key = %key.fingerprint(), "configured key");
        }

        *self.lock() = RegistryState::Ready(Rotation::new(unique));
        Ok(())
    }

    // Back to `Uninitialized`, dropping keys and history
    pub fn teardown(&self) {
        *self.lock() = RegistryState::Uninitialized;
        info!("Key registry torn down");
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.lock(), RegistryState::Ready(_))
    }

    /// Next key in rotation, skipping keys already at `limit` within its window.
    /// Selecting a key does not count as using it; see [`KeyRegistry::report_usage`].
    pub fn next_key(&self, limit: Option<RateLimit>) -> Result<ApiKey> {
        let now = self.clock.now();
        self.with_ready(|rotation| {
            let idx = rotation.select(now, limit.as_ref()).inspect_err(|err| {
                warn!("{}", err);
            })?;
            let key = rotation.keys[idx].clone();
            debug!(key = %key.fingerprint(), "dispensed key");
            Ok(key)
        })
    }

    /// Select a key and record one use of it at the same instant
    pub fn acquire(&self, limit: Option<RateLimit>) -> Result<ApiKey> {
        let now = self.clock.now();
        self.with_ready(|rotation| {
            let idx = rotation.select(now, limit.as_ref()).inspect_err(|err| {
                warn!("{}", err);
            })?;
            rotation.histories[idx].record(now);
            let key = rotation.keys[idx].clone();
            debug!(key = %key.fingerprint(), "acquired key");
            Ok(key)
        })
    }

    /// Record that `key` was used just now
    pub fn report_usage(&self, key: &str) -> Result<()> {
        self.report_usage_at(key, self.clock.now())
    }

    /// Record that `key` was used at `at`
    pub fn report_usage_at(&self, key: &str, at: DateTime<Utc>) -> Result<()> {
        self.with_ready(|rotation| rotation.record(key, at))
            .inspect(|_| debug!(key = %fingerprint(key), "usage reported"))
    }

    /// Lifetime use count per key since the last `initialize`
    pub fn usage_snapshot(&self) -> Result<HashMap<ApiKey, u64>> {
        self.with_ready(|rotation| {
            Ok(rotation
                .positions
                .iter()
                .map(|(key, &idx)| (key.clone(), rotation.histories[idx].total()))
                .collect())
        })
    }

    /// Uses per key within the trailing `window`
    pub fn window_usage(&self, window: Duration) -> Result<HashMap<ApiKey, usize>> {
        let now = self.clock.now();
        self.with_ready(|rotation| {
            rotation.note_window(window);
            Ok(rotation
                .positions
                .iter()
                .map(|(key, &idx)| (key.clone(), rotation.histories[idx].count_within(now, window)))
                .collect())
        })
    }

    /// Keys in configuration order with their lifetime count, or their count
    /// within `window` when given, read under one lock
    pub fn usage_report(&self, window: Option<Duration>) -> Result<Vec<(ApiKey, u64)>> {
        let now = self.clock.now();
        self.with_ready(|rotation| {
            let report = (0..rotation.keys.len())
                .map(|idx| (rotation.keys[idx].clone(), rotation.count(idx, now, window)))
                .collect();
            Ok(report)
        })
    }

    pub fn configured_keys(&self) -> Result<Vec<ApiKey>> {
        self.with_ready(|rotation| Ok(rotation.keys.clone()))
    }

    /// Drop timestamps older than both the widest requested window and the
    /// retention floor. Returns the number removed; lifetime totals are unaffected.
    pub fn prune_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let retention = self.retention;
        self.with_ready(|rotation| {
            let Some(window) = rotation.largest_window.max(retention) else {
                return Ok(0);
            };
            let removed: usize = rotation
                .histories
                .iter_mut()
                .map(|h| h.prune(now, window))
                .sum();
            Ok(removed)
        })
    }
}
