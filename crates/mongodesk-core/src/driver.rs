//! Driver collaborator trait and dial options

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::{Connection, Result};

/// Options applied to every dial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialOptions {
    /// Timeout for establishing a TCP connection
    pub connect_timeout: Duration,
    /// Timeout for selecting a server to run an operation against
    pub server_selection_timeout: Duration,
    /// Maximum pooled sockets per client
    pub max_pool_size: u32,
    /// Application name reported to the server
    pub app_name: Option<String>,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            server_selection_timeout: Duration::from_secs(30),
            max_pool_size: 10,
            app_name: None,
        }
    }
}

/// A database driver able to dial out to a server.
///
/// Implementations must classify dial failures into
/// [`MongodeskError::ConnectionFailed`](crate::MongodeskError::ConnectionFailed)
/// and never include the connection string in error text.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Get the driver identifier (e.g., "mongodb")
    fn id(&self) -> &'static str;

    /// Get the human-readable driver name
    fn display_name(&self) -> &'static str {
        self.id()
    }

    /// Dial a server and verify it answers before returning a handle
    async fn connect(
        &self,
        connection_string: &str,
        options: &DialOptions,
    ) -> Result<Arc<dyn Connection>>;
}
