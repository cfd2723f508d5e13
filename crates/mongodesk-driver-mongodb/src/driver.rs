//! MongoDB driver implementation

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::{Client, options::ClientOptions};
use mongodesk_core::{
    Connection, DatabaseDriver, DatabaseInfo, DialOptions, FailureCategory, MongodeskError,
    Result, ServerInfo,
};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Database used for server-level commands
const ADMIN_DB: &str = "admin";

/// MongoDB database driver
///
/// Dials servers through the official driver and verifies each new client
/// with a `ping` before handing it out, since client construction itself is
/// lazy and would otherwise hide unreachable servers until first use.
pub struct MongoDbDriver;

impl MongoDbDriver {
    /// Create a new MongoDB driver instance
    pub fn new() -> Self {
        tracing::debug!("MongoDB driver initialized");
        Self
    }
}

impl Default for MongoDbDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MongoDbDriver {
    fn id(&self) -> &'static str {
        "mongodb"
    }

    fn display_name(&self) -> &'static str {
        "MongoDB"
    }

    #[tracing::instrument(skip(self, connection_string, options))]
    async fn connect(
        &self,
        connection_string: &str,
        options: &DialOptions,
    ) -> Result<Arc<dyn Connection>> {
        tracing::debug!("connecting to MongoDB");

        let mut client_options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| to_dial_error(&e))?;
        apply_dial_options(&mut client_options, options);

        let client = Client::with_options(client_options).map_err(|e| to_dial_error(&e))?;

        if let Err(e) = client
            .database(ADMIN_DB)
            .run_command(doc! { "ping": 1 })
            .await
        {
            let err = to_dial_error(&e);
            client.shutdown().await;
            return Err(err);
        }

        tracing::debug!("MongoDB server answered ping");
        Ok(Arc::new(MongoDbConnection::new(client)))
    }
}

/// Apply dial options on top of whatever the connection string specified
pub fn apply_dial_options(client_options: &mut ClientOptions, options: &DialOptions) {
    client_options.connect_timeout = Some(options.connect_timeout);
    client_options.server_selection_timeout = Some(options.server_selection_timeout);
    client_options.max_pool_size = Some(options.max_pool_size);
    if let Some(app_name) = &options.app_name {
        client_options.app_name = Some(app_name.clone());
    }
}

/// MongoDB client handle implementing the Connection trait
pub struct MongoDbConnection {
    client: Client,
    closed: AtomicBool,
}

impl MongoDbConnection {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    /// Get the MongoDB client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a database handle
    pub fn db(&self, name: &str) -> mongodb::Database {
        self.client.database(name)
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MongodeskError::Driver("Connection is closed".to_string()));
        }
        Ok(())
    }

    async fn admin_command(&self, command: Document) -> Result<Document> {
        self.ensure_not_closed()?;
        self.db(ADMIN_DB)
            .run_command(command)
            .await
            .map_err(|e| to_dial_error(&e))
    }
}

#[async_trait]
impl Connection for MongoDbConnection {
    fn driver_name(&self) -> &str {
        "mongodb"
    }

    async fn ping(&self) -> Result<()> {
        self.admin_command(doc! { "ping": 1 }).await.map(|_| ())
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        self.ensure_not_closed()?;
        let databases = self
            .client
            .list_databases()
            .await
            .map_err(|e| to_dial_error(&e))?;

        Ok(databases
            .into_iter()
            .map(|db| DatabaseInfo {
                name: db.name,
                size_on_disk: Some(db.size_on_disk),
                empty: Some(db.empty),
            })
            .collect())
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        let build_info = self.admin_command(doc! { "buildInfo": 1 }).await?;
        Ok(server_info_from_document(&build_info))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client.clone().shutdown().await;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Extract the fields we surface from a `buildInfo` reply
pub fn server_info_from_document(build_info: &Document) -> ServerInfo {
    let max_bson_object_size = match build_info.get("maxBsonObjectSize") {
        Some(Bson::Int32(n)) => Some(i64::from(*n)),
        Some(Bson::Int64(n)) => Some(*n),
        Some(Bson::Double(n)) => Some(*n as i64),
        _ => None,
    };

    ServerInfo {
        version: build_info
            .get_str("version")
            .unwrap_or("unknown")
            .to_string(),
        git_version: build_info.get_str("gitVersion").ok().map(str::to_string),
        max_bson_object_size,
    }
}

/// Convert a driver error into the core taxonomy.
///
/// Malformed connection strings become validation errors; everything else is
/// a classified connection failure whose message never echoes driver output.
pub fn to_dial_error(err: &MongoError) -> MongodeskError {
    if let ErrorKind::InvalidArgument { .. } = err.kind.as_ref() {
        tracing::debug!(error = %err, "MongoDB rejected client options");
        return MongodeskError::Validation("Invalid MongoDB connection string".to_string());
    }

    let category = classify_error(err);
    tracing::debug!(error = %err, category = %category, "MongoDB operation failed");
    MongodeskError::connection_failed(category)
}

/// Classify a driver error by kind, falling back to its message text
pub fn classify_error(err: &MongoError) -> FailureCategory {
    match err.kind.as_ref() {
        ErrorKind::Authentication { .. } => FailureCategory::Authentication,
        ErrorKind::DnsResolve { .. } => FailureCategory::Network,
        ErrorKind::Io(io) => classify_io_error(io.kind()),
        ErrorKind::Command(command) => classify_command_code(command.code)
            .unwrap_or_else(|| FailureCategory::from_message(&command.message)),
        ErrorKind::ServerSelection { message, .. } => {
            match FailureCategory::from_message(message) {
                FailureCategory::Generic => FailureCategory::Timeout,
                category => category,
            }
        }
        ErrorKind::ConnectionPoolCleared { .. } => FailureCategory::Network,
        _ => FailureCategory::from_message(&err.to_string()),
    }
}

/// Classify a socket-level failure
pub fn classify_io_error(kind: std::io::ErrorKind) -> FailureCategory {
    use std::io::ErrorKind as Io;
    match kind {
        Io::ConnectionRefused => FailureCategory::Refused,
        Io::TimedOut | Io::WouldBlock => FailureCategory::Timeout,
        Io::PermissionDenied => FailureCategory::Authorization,
        _ => FailureCategory::Network,
    }
}

/// Map well-known server error codes
pub fn classify_command_code(code: i32) -> Option<FailureCategory> {
    match code {
        // AuthenticationFailed, Atlas "bad auth"
        18 | 8000 => Some(FailureCategory::Authentication),
        // Unauthorized
        13 => Some(FailureCategory::Authorization),
        // NetworkTimeout, ExceededTimeLimit
        89 | 50 => Some(FailureCategory::Timeout),
        // HostUnreachable, HostNotFound
        6 | 7 => Some(FailureCategory::Network),
        _ => None,
    }
}
