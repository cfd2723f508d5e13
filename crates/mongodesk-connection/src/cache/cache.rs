//! Connection cache implementation

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use mongodesk_core::Connection;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::stats::{CacheStats, CachedConnectionStats};

/// A cached handle with its idle timestamp
struct CacheEntry {
    connection: Arc<dyn Connection>,
    last_touched_at: Instant,
}

impl CacheEntry {
    fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            last_touched_at: Instant::now(),
        }
    }

    fn is_expired(&self, config: &CacheConfig, now: Instant) -> bool {
        self.connection.is_closed() || now.duration_since(self.last_touched_at) > config.ttl()
    }
}

/// In-memory map from connection id to a live client handle.
///
/// The cache is the sole owner of the handles it stores; callers borrow them
/// through `Arc` clones for the duration of a request. Every removal path
/// closes the removed handle, and closing never fails the caller.
///
/// The map lock is never held across an `.await`: entries are detached under
/// the lock and closed after it is released.
pub struct ConnectionCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ConnectionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a live handle, refreshing its idle timestamp.
    ///
    /// An expired entry is evicted (and its client closed) instead of being
    /// returned.
    pub async fn get(&self, connection_id: &str) -> Option<Arc<dyn Connection>> {
        let expired = {
            let mut entries = self.entries.lock();
            let now = Instant::now();
            let entry = entries.get_mut(connection_id)?;
            if !entry.is_expired(&self.config, now) {
                entry.last_touched_at = now;
                return Some(entry.connection.clone());
            }
            entries.remove(connection_id)
        };

        if let Some(entry) = expired {
            tracing::debug!(connection_id = %connection_id, "evicting expired connection on lookup");
            close_quietly(connection_id, entry.connection).await;
        }
        None
    }

    /// Store a handle. A different handle already cached under the same id
    /// is closed.
    pub async fn put(&self, connection_id: &str, connection: Arc<dyn Connection>) {
        let replaced = self
            .entries
            .lock()
            .insert(connection_id.to_string(), CacheEntry::new(connection.clone()));

        if let Some(old) = replaced {
            if !Arc::ptr_eq(&old.connection, &connection) {
                tracing::debug!(connection_id = %connection_id, "closing replaced connection");
                close_quietly(connection_id, old.connection).await;
            }
        }
    }

    /// Remove and close a handle. Returns whether an entry was present;
    /// evicting an absent id is a no-op.
    pub async fn evict(&self, connection_id: &str) -> bool {
        let removed = self.entries.lock().remove(connection_id);
        match removed {
            Some(entry) => {
                close_quietly(connection_id, entry.connection).await;
                true
            }
            None => false,
        }
    }

    /// Close every cached handle concurrently and clear the map
    pub async fn evict_all(&self) -> usize {
        let drained: Vec<(String, CacheEntry)> = self.entries.lock().drain().collect();
        let count = drained.len();

        join_all(
            drained
                .into_iter()
                .map(|(id, entry)| async move { close_quietly(&id, entry.connection).await }),
        )
        .await;

        if count > 0 {
            tracing::info!(count, "closed all cached connections");
        }
        count
    }

    /// Evict every entry idle for longer than the TTL. Returns the number
    /// of evicted entries.
    pub async fn sweep_expired(&self) -> usize {
        let expired: Vec<(String, CacheEntry)> = {
            let mut entries = self.entries.lock();
            let now = Instant::now();
            let ids: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(&self.config, now))
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| entries.remove(&id).map(|entry| (id, entry)))
                .collect()
        };
        let count = expired.len();

        join_all(
            expired
                .into_iter()
                .map(|(id, entry)| async move { close_quietly(&id, entry.connection).await }),
        )
        .await;

        if count > 0 {
            tracing::debug!(count, "swept expired connections");
        }
        count
    }

    /// Membership check that does not refresh the idle timestamp
    pub fn contains(&self, connection_id: &str) -> bool {
        self.entries.lock().contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Read-only snapshot of every entry's idle age
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let now = Instant::now();
        let mut connections: Vec<CachedConnectionStats> = entries
            .iter()
            .map(|(id, entry)| CachedConnectionStats {
                connection_id: id.clone(),
                age_ms: now.duration_since(entry.last_touched_at).as_millis() as u64,
            })
            .collect();
        connections.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));

        CacheStats {
            active_connections: connections.len(),
            connections,
        }
    }
}

impl Default for ConnectionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Close a handle, logging and discarding any failure.
///
/// Used on every eviction and shutdown path: a close error must never
/// block the removal of an entry.
pub async fn close_quietly(connection_id: &str, connection: Arc<dyn Connection>) {
    if let Err(e) = connection.close().await {
        tracing::debug!(connection_id = %connection_id, error = %e, "ignoring error while closing connection");
    }
}
