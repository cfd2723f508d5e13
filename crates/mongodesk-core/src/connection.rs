//! Connection trait and server metadata

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;

use crate::Result;

/// Summary of one database on a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub name: String,
    pub size_on_disk: Option<u64>,
    pub empty: Option<bool>,
}

impl DatabaseInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_on_disk: None,
            empty: None,
        }
    }
}

/// Server build information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: String,
    pub git_version: Option<String>,
    pub max_bson_object_size: Option<i64>,
}

/// A live, driver-managed client handle.
///
/// Handles are owned by the connection cache; everything else borrows them
/// through an `Arc` for the duration of a request.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mongodb")
    fn driver_name(&self) -> &str;

    /// Issue a lightweight liveness probe against the server
    async fn ping(&self) -> Result<()>;

    /// List the databases visible to the authenticated user
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>>;

    /// Fetch server build information
    async fn server_info(&self) -> Result<ServerInfo>;

    /// Close the underlying client and release its pooled sockets
    async fn close(&self) -> Result<()>;

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;

    /// Access the concrete handle, for controllers that need driver-specific
    /// calls
    fn as_any(&self) -> &dyn Any;
}
