use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

// Per-request limit: at most `max_uses` reported uses per key within the trailing `time_window`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub time_window: Duration,
    pub max_uses: u32,
}

impl RateLimit {
    pub fn new(time_window: Duration, max_uses: u32) -> Self {
        Self {
            time_window,
            max_uses,
        }
    }

    pub fn per_secs(secs: u64, max_uses: u32) -> Self {
        Self::new(Duration::from_secs(secs), max_uses)
    }
}

/// Start of the trailing window ending at `now`. A timestamp `t` is inside the
/// window iff `t > start`, so a use exactly `window` old no longer counts.
/// `None` means the window reaches back past the representable range.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::from_std(window).ok()?;
    now.checked_sub_signed(delta)
}

/// Usage timestamps of one key, oldest first, plus its lifetime count.
#[derive(Debug, Default, Clone)]
pub struct UsageHistory {
    timestamps: VecDeque<DateTime<Utc>>,
    total: u64,
}

impl UsageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at: DateTime<Utc>) {
        match self.timestamps.back() {
            Some(last) if *last > at => {
                // late report, keep the sequence sorted
                let idx = self.timestamps.partition_point(|t| *t <= at);
                self.timestamps.insert(idx, at);
            }
            _ => self.timestamps.push_back(at),
        }
        self.total += 1;
    }

    // lifetime count, pruning leaves it alone
    pub fn total(&self) -> u64 {
        self.total
    }

    // timestamps currently retained
    pub fn retained(&self) -> usize {
        self.timestamps.len()
    }

    fn first_in_window(&self, now: DateTime<Utc>, window: Duration) -> usize {
        match window_start(now, window) {
            Some(start) => self.timestamps.partition_point(|t| *t <= start),
            None => 0,
        }
    }

    pub fn count_within(&self, now: DateTime<Utc>, window: Duration) -> usize {
        self.timestamps.len() - self.first_in_window(now, window)
    }

    pub fn allows(&self, now: DateTime<Utc>, limit: &RateLimit) -> bool {
        self.count_within(now, limit.time_window) < limit.max_uses as usize
    }

    /// Earliest instant at which this key is under `limit` again.
    /// Returns `now` if it already is, `None` if it never will be.
    pub fn available_at(&self, now: DateTime<Utc>, limit: &RateLimit) -> Option<DateTime<Utc>> {
        let max = limit.max_uses as usize;
        if max == 0 {
            return None;
        }

        let first = self.first_in_window(now, limit.time_window);
        let in_window = self.timestamps.len() - first;
        if in_window < max {
            return Some(now);
        }

        // once this one ages out only max - 1 uses remain in the window
        let pivot = self.timestamps[first + in_window - max];
        let delta = TimeDelta::from_std(limit.time_window).ok()?;
        pivot.checked_add_signed(delta)
    }

    /// Drop timestamps that fall outside a `window` ending at `now`.
    /// Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let expired = self.first_in_window(now, window);
        self.timestamps.drain(..expired);
        expired
    }
}
