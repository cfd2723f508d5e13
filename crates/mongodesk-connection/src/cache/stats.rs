//! Cache statistics types

use serde::{Deserialize, Serialize};

/// Snapshot of the cache for health-check callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cached handles
    pub active_connections: usize,
    /// One entry per cached handle, sorted by id
    pub connections: Vec<CachedConnectionStats>,
}

/// Idle age of a single cached handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedConnectionStats {
    pub connection_id: String,
    /// Milliseconds since the handle was last touched
    pub age_ms: u64,
}

impl CacheStats {
    pub fn is_empty(&self) -> bool {
        self.active_connections == 0
    }

    /// Look up the entry for one connection id
    pub fn connection(&self, connection_id: &str) -> Option<&CachedConnectionStats> {
        self.connections
            .iter()
            .find(|c| c.connection_id == connection_id)
    }
}
