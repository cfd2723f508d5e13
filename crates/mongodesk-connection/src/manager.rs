//! Connection manager: the only component that dials database servers

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use mongodesk_core::{
    AppConfig, Connection, DatabaseDriver, DatabaseInfo, DialOptions, FailureCategory, InputGate,
    MongodeskError, Result, ServerInfo,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::{CacheConfig, CacheStats, ConnectionCache, close_quietly};
use crate::health::ping_with_timeout;
use crate::reconnect::RetryPolicy;

/// Label used in logs for clients that are never cached
const THROWAWAY_CLIENT: &str = "<test>";

/// Result of testing a connection string with a throwaway client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub databases: Option<Vec<DatabaseInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestFailure>,
}

/// Why a connection test failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    /// Failure category for dial failures; absent for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,
    pub message: String,
}

impl TestOutcome {
    fn succeeded(databases: Vec<DatabaseInfo>, server_info: ServerInfo) -> Self {
        Self {
            ok: true,
            databases: Some(databases),
            server_info: Some(server_info),
            error: None,
        }
    }

    fn failed(category: Option<FailureCategory>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            databases: None,
            server_info: None,
            error: Some(TestFailure {
                category,
                message: message.into(),
            }),
        }
    }

    fn from_error(err: &MongodeskError) -> Self {
        match err.failure_category() {
            Some(category) => Self::failed(Some(category), category.user_message()),
            None => Self::failed(None, err.to_string()),
        }
    }

    /// Convert a failed outcome back into an error
    pub fn into_result(self) -> Result<Self> {
        match &self.error {
            None => Ok(self),
            Some(TestFailure {
                category: Some(category),
                ..
            }) => Err(MongodeskError::connection_failed(*category)),
            Some(TestFailure {
                category: None,
                message,
            }) => Err(MongodeskError::Validation(message.clone())),
        }
    }
}

/// Owns the connection cache and every dial into it.
///
/// Connection strings are validated before any dial, dials are retried
/// according to the retry policy, and concurrent requests for the same
/// uncached id share a single dial.
pub struct ConnectionManager {
    driver: Arc<dyn DatabaseDriver>,
    cache: Arc<ConnectionCache>,
    dial_options: DialOptions,
    retry: RetryPolicy,
    /// One lock per id with a dial in progress
    in_flight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager with default cache, dial and retry settings
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            cache: Arc::new(ConnectionCache::default()),
            dial_options: DialOptions::default(),
            retry: RetryPolicy::default(),
            in_flight: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Create a manager configured from the application config
    pub fn from_config(driver: Arc<dyn DatabaseDriver>, config: &AppConfig) -> Self {
        Self::new(driver)
            .with_cache_config(CacheConfig::new(config.cache_ttl(), config.sweep_interval()))
            .with_dial_options(config.dial_options())
            .with_retry_policy(RetryPolicy::exponential(
                config.retry_attempts,
                std::time::Duration::from_millis(config.retry_base_delay_ms),
            ))
    }

    /// Replace the cache configuration. Must be called before any handle is
    /// cached.
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = Arc::new(ConnectionCache::new(config));
        self
    }

    pub fn with_dial_options(mut self, options: DialOptions) -> Self {
        self.dial_options = options;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    pub fn dial_options(&self) -> &DialOptions {
        &self.dial_options
    }

    /// Test a connection string with a throwaway client that is never cached
    /// and always closed.
    #[tracing::instrument(skip_all)]
    pub async fn test_connection(&self, connection_string: &str) -> TestOutcome {
        let verdict = InputGate::validate_connection_string(connection_string);
        if let Some(reason) = verdict.reason() {
            tracing::debug!(reason, "connection string rejected");
            return TestOutcome::failed(None, reason);
        }

        let conn = match self.driver.connect(connection_string, &self.dial_options).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::info!(category = ?e.failure_category(), "connection test failed to dial");
                return TestOutcome::from_error(&e);
            }
        };

        let probe = async {
            let databases = conn.list_databases().await?;
            let server_info = conn.server_info().await?;
            Ok::<_, MongodeskError>((databases, server_info))
        }
        .await;

        close_quietly(THROWAWAY_CLIENT, conn).await;

        match probe {
            Ok((databases, server_info)) => {
                tracing::info!(
                    databases = databases.len(),
                    version = %server_info.version,
                    "connection test succeeded"
                );
                TestOutcome::succeeded(databases, server_info)
            }
            Err(e) => {
                tracing::info!(category = ?e.failure_category(), "connection test failed after dial");
                TestOutcome::from_error(&e)
            }
        }
    }

    /// Return the cached handle for `connection_id`, dialing and caching a
    /// new one on a miss.
    #[tracing::instrument(skip(self, connection_string), fields(connection_id = %connection_id))]
    pub async fn get_or_create_client(
        &self,
        connection_id: &str,
        connection_string: &str,
    ) -> Result<Arc<dyn Connection>> {
        if let Some(conn) = self.cache.get(connection_id).await {
            return Ok(conn);
        }

        InputGate::validate_connection_string(connection_string).into_result()?;

        let slot = self.claim_dial_slot(connection_id);
        let _dialing = slot.lock.lock().await;

        // Another caller may have finished dialing while we waited
        if let Some(conn) = self.cache.get(connection_id).await {
            tracing::debug!("reusing client dialed by a concurrent request");
            return Ok(conn);
        }

        tracing::info!("dialing new client");
        let driver = &self.driver;
        let options = &self.dial_options;
        let conn = self
            .retry
            .run(move |_| driver.connect(connection_string, options))
            .await?;

        self.cache.put(connection_id, conn.clone()).await;
        tracing::info!("client cached");
        Ok(conn)
    }

    /// Cached handle for `connection_id`, if any. Refreshes its idle
    /// timestamp.
    pub async fn get_cached(&self, connection_id: &str) -> Option<Arc<dyn Connection>> {
        self.cache.get(connection_id).await
    }

    /// Close and forget the handle for `connection_id`. Returns whether a
    /// handle was cached.
    #[tracing::instrument(skip(self), fields(connection_id = %connection_id))]
    pub async fn close_connection(&self, connection_id: &str) -> bool {
        let closed = self.cache.evict(connection_id).await;
        if closed {
            tracing::info!("connection closed");
        }
        closed
    }

    /// Stop the sweeper and close every cached handle. Safe to call more
    /// than once.
    #[tracing::instrument(skip(self))]
    pub async fn close_all(&self) -> usize {
        self.stop_sweeper();
        self.cache.evict_all().await
    }

    /// Drop any cached handle for `connection_id` and dial a fresh one
    #[tracing::instrument(skip(self, connection_string), fields(connection_id = %connection_id))]
    pub async fn reconnect(
        &self,
        connection_id: &str,
        connection_string: &str,
    ) -> Result<Arc<dyn Connection>> {
        self.close_connection(connection_id).await;
        self.get_or_create_client(connection_id, connection_string)
            .await
    }

    /// Whether a handle is cached, without refreshing its timestamp
    pub fn is_active(&self, connection_id: &str) -> bool {
        self.cache.contains(connection_id)
    }

    /// Probe the cached handle. Any failure, including a missing handle,
    /// yields `false`.
    #[tracing::instrument(skip(self), fields(connection_id = %connection_id))]
    pub async fn ping(&self, connection_id: &str) -> bool {
        let Some(conn) = self.cache.get(connection_id).await else {
            return false;
        };

        match ping_with_timeout(conn.as_ref(), self.dial_options.server_selection_timeout).await {
            Ok(latency) => {
                tracing::debug!(latency_ms = latency.as_millis() as u64, "ping succeeded");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "ping failed");
                false
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Start the periodic expiry sweep on the current Tokio runtime.
    ///
    /// Does nothing if the sweeper is already running. The task holds only a
    /// weak reference to the cache and ends once the manager is dropped.
    pub fn start_sweeper(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let cache: Weak<ConnectionCache> = Arc::downgrade(&self.cache);
        let period = self.cache.config().sweep_interval();
        tracing::debug!(interval_ms = period.as_millis() as u64, "starting cache sweeper");

        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.sweep_expired().await;
            }
        }));
    }

    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of ids with a dial in progress or awaited
    pub fn in_flight_dials(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            tracing::debug!("cache sweeper stopped");
        }
    }

    fn claim_dial_slot<'a>(&'a self, connection_id: &'a str) -> DialSlot<'a> {
        let lock = self
            .in_flight
            .lock()
            .entry(connection_id.to_string())
            .or_default()
            .clone();
        DialSlot {
            in_flight: &self.in_flight,
            connection_id,
            lock,
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

/// Membership in the in-flight dial map for one id. Removes the map entry
/// when the last interested caller is done.
struct DialSlot<'a> {
    in_flight: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    connection_id: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for DialSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        // The map holds one reference and this slot another
        let unused = in_flight
            .get(self.connection_id)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2);
        if unused {
            in_flight.remove(self.connection_id);
        }
    }
}
