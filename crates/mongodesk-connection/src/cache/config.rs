//! Cache configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the connection cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Idle time in milliseconds after which an entry expires
    ttl_ms: u64,
    /// Interval in milliseconds between background sweeps
    sweep_interval_ms: u64,
}

impl CacheConfig {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as u64,
            sweep_interval_ms: sweep_interval.as_millis() as u64,
        }
    }

    /// Set the idle TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = ttl.as_millis() as u64;
        self
    }

    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Get the idle TTL
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Get the sweep interval. Never zero, so it can drive a timer.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

impl Default for CacheConfig {
    /// Five minute TTL, swept every minute
    fn default() -> Self {
        Self {
            ttl_ms: 300_000,
            sweep_interval_ms: 60_000,
        }
    }
}
