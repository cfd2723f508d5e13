//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use mongodesk_connection::{CacheConfig, ConnectionManager, ConnectionStore, RetryPolicy};
use mongodesk_core::{
    Connection, DatabaseDriver, DatabaseInfo, DialOptions, FailureCategory, MongodeskError,
    Result, SecretCodec, ServerInfo,
};
use mongodesk_services::ConnectionService;

pub const LOCAL_URI: &str = "mongodb://localhost:27017";
pub const OTHER_URI: &str = "mongodb://replica.internal:27017/?replicaSet=rs0";

/// Mock client handle remembering the string it was dialed with
pub struct MockConnection {
    pub dialed_with: String,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MockConnection {
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn ping(&self) -> Result<()> {
        if self.is_closed() {
            return Err(MongodeskError::Driver("Connection is closed".into()));
        }
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        Ok(vec![
            DatabaseInfo::new("admin"),
            DatabaseInfo::new("inventory"),
        ])
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        Ok(ServerInfo {
            version: "6.0.12".into(),
            ..ServerInfo::default()
        })
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mock driver with per-URI scripted failures and a log of every dial
#[derive(Default)]
pub struct MockDriver {
    failures: Mutex<HashMap<String, VecDeque<FailureCategory>>>,
    dials: Mutex<Vec<Arc<MockConnection>>>,
    attempts: AtomicUsize,
}

impl MockDriver {
    /// Fail the next dials to `uri` with these categories, in order
    pub fn fail(&self, uri: &str, failures: impl IntoIterator<Item = FailureCategory>) {
        self.failures
            .lock()
            .entry(uri.to_string())
            .or_default()
            .extend(failures);
    }

    /// Total dial attempts, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every successfully dialed handle, in order
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.dials.lock().clone()
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn connect(
        &self,
        connection_string: &str,
        _options: &DialOptions,
    ) -> Result<Arc<dyn Connection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .failures
            .lock()
            .get_mut(connection_string)
            .and_then(VecDeque::pop_front);
        if let Some(category) = failure {
            return Err(MongodeskError::connection_failed(category));
        }

        let conn = Arc::new(MockConnection {
            dialed_with: connection_string.to_string(),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        });
        self.dials.lock().push(conn.clone());
        Ok(conn)
    }
}

/// A service wired to a mock driver and a store in a temporary directory
pub struct Fixture {
    pub service: ConnectionService,
    pub driver: Arc<MockDriver>,
    pub store: Arc<ConnectionStore>,
    pub codec: Arc<SecretCodec>,
    pub dir: TempDir,
}

pub fn test_codec() -> SecretCodec {
    SecretCodec::new(&[42u8; 32]).expect("32-byte key")
}

pub async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(
        ConnectionStore::open(dir.path().join("connections.json"))
            .await
            .expect("open store"),
    );
    let driver = Arc::new(MockDriver::default());
    let dyn_driver: Arc<dyn DatabaseDriver> = driver.clone();
    let manager = Arc::new(
        ConnectionManager::new(dyn_driver)
            .with_cache_config(CacheConfig::new(
                Duration::from_secs(300),
                Duration::from_secs(60),
            ))
            .with_retry_policy(RetryPolicy::exponential(3, Duration::from_millis(10))),
    );
    let codec = Arc::new(test_codec());

    Fixture {
        service: ConnectionService::new(manager, store.clone(), codec.clone()),
        driver,
        store,
        codec,
        dir,
    }
}
