//! Liveness probing for cached handles
//!
//! Issues the driver's lightweight ping and measures the round trip.

use std::time::Duration;

use mongodesk_core::{Connection, FailureCategory};
use thiserror::Error;
use tokio::time::Instant;

/// Result of a ping operation
pub type PingResult = Result<Duration, PingError>;

/// Error that can occur during a ping operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PingError {
    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Ping failed: {message}")]
    Failed {
        category: Option<FailureCategory>,
        message: String,
    },

    #[error("Ping timed out")]
    Timeout,
}

/// Ping a connection and return the round-trip time.
///
/// A handle that reports itself closed is not pinged.
///
/// # Arguments
///
/// * `conn` - The live handle to ping
///
/// # Returns
///
/// The measured round-trip latency, or a [`PingError`] carrying the failure
/// category when the driver error could be classified
///
/// # Example
///
/// ```ignore
/// use mongodesk_connection::health::ping_connection;
///
/// let latency = ping_connection(connection.as_ref()).await?;
/// println!("Server latency: {:?}", latency);
/// ```
pub async fn ping_connection(conn: &dyn Connection) -> PingResult {
    if conn.is_closed() {
        return Err(PingError::ConnectionClosed);
    }

    let start = Instant::now();
    match conn.ping().await {
        Ok(()) => Ok(start.elapsed()),
        Err(e) => Err(PingError::Failed {
            category: e.failure_category(),
            message: e.to_string(),
        }),
    }
}

/// Ping a connection, giving up after `timeout`.
///
/// # Arguments
///
/// * `conn` - The live handle to ping
/// * `timeout` - Upper bound on the whole ping
///
/// # Returns
///
/// The round-trip latency, or [`PingError::Timeout`] if the ping did not
/// finish in time
pub async fn ping_with_timeout(conn: &dyn Connection, timeout: Duration) -> PingResult {
    tokio::time::timeout(timeout, ping_connection(conn))
        .await
        .unwrap_or(Err(PingError::Timeout))
}
