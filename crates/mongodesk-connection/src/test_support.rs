//! Mock driver collaborator shared by the crate's unit tests

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mongodesk_core::{
    Connection, DatabaseDriver, DatabaseInfo, DialOptions, FailureCategory, MongodeskError,
    Result, ServerInfo,
};
use parking_lot::Mutex;

/// Mock connection recording how often it was closed
pub struct MockConnection {
    pub id: usize,
    closed: AtomicBool,
    close_calls: Arc<AtomicUsize>,
    fail_close: bool,
    ping_ok: AtomicBool,
    list_ok: bool,
}

impl MockConnection {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
            close_calls: Arc::new(AtomicUsize::new(0)),
            fail_close: false,
            ping_ok: AtomicBool::new(true),
            list_ok: true,
        }
    }

    /// A connection whose `close` always errors
    pub fn failing_close(id: usize) -> Self {
        Self {
            fail_close: true,
            ..Self::new(id)
        }
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn set_ping_ok(&self, ok: bool) {
        self.ping_ok.store(ok, Ordering::SeqCst);
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
        if self.ping_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MongodeskError::connection_failed(FailureCategory::Network))
        }
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        if !self.list_ok {
            return Err(MongodeskError::connection_failed(FailureCategory::Authorization));
        }
        Ok(vec![DatabaseInfo::new("admin"), DatabaseInfo::new("app")])
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        Ok(ServerInfo {
            version: "7.0.4".into(),
            git_version: None,
            max_bson_object_size: Some(16_777_216),
        })
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(MongodeskError::Driver("socket already gone".into()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mock driver counting dials and replaying scripted failures
pub struct MockDriver {
    dials: AtomicUsize,
    failures: Mutex<VecDeque<FailureCategory>>,
    dial_delay: Option<Duration>,
    listing_fails: bool,
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            dials: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
            dial_delay: None,
            listing_fails: false,
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next dials with these categories, in order
    pub fn with_failures(self, failures: impl IntoIterator<Item = FailureCategory>) -> Self {
        self.failures.lock().extend(failures);
        self
    }

    /// Sleep for `delay` inside every dial
    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }

    /// Hand out connections whose database listing fails
    pub fn with_failing_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Every connection handed out so far
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().clone()
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn connect(
        &self,
        _connection_string: &str,
        _options: &DialOptions,
    ) -> Result<Arc<dyn Connection>> {
        let id = self.dials.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.dial_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(category) = self.failures.lock().pop_front() {
            return Err(MongodeskError::connection_failed(category));
        }

        let mut connection = MockConnection::new(id);
        connection.list_ok = !self.listing_fails;
        let connection = Arc::new(connection);
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }
}
