//! Fixed-window request counting per client key.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::Error;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Admission control over a fixed time window, keyed by client
/// identifier.
///
/// Entries are sharded in a `DashMap`; the shard entry stays held for the
/// whole increment-and-compare, so concurrent callers on the same key
/// serialize.
pub struct FixedWindowLimiter {
    entries: DashMap<String, WindowEntry>,
    limit: u32,
    window: Duration,
    idle_windows: u32,
}

impl FixedWindowLimiter {
    /// Create a limiter. A zero window is a configuration error; a zero
    /// limit is accepted and denies everything.
    pub fn new(limit: u32, window: Duration, idle_windows: u32) -> Result<Self, Error> {
        if window.is_zero() {
            return Err(Error::Configuration(
                "rate limit window must be positive".to_string(),
            ));
        }
        Ok(Self {
            entries: DashMap::new(),
            limit,
            window,
            idle_windows,
        })
    }

    /// Admit or deny a request from `key` right now.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Admit or deny a request from `key` at an explicit timestamp.
    /// Timestamps must be monotonically non-decreasing per key.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        if self.limit == 0 {
            return false;
        }

        let mut entry = self
            .entries
            .entry(key.to_owned())
            .or_insert(WindowEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;
        entry.count <= self.limit
    }

    /// Evict entries whose window has been idle past the configured
    /// horizon. Returns the number of evicted keys.
    pub fn sweep(&self, now: Instant) -> usize {
        let idle_horizon = self.window.saturating_mul(self.idle_windows.max(1));
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.duration_since(e.window_start) < idle_horizon);
        before - self.entries.len()
    }

    /// Number of client keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}
