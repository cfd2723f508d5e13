//! Mongodesk Connection - Connection lifecycle management
//!
//! This crate owns every live MongoDB client in the process: it caches
//! handles per connection id with idle expiry, dials through the driver
//! collaborator with bounded retry, and persists named connection profiles
//! with their connection strings encrypted at rest.

pub mod cache;
mod config;
pub mod health;
mod manager;
pub mod reconnect;
mod storage;

#[cfg(test)]
mod test_support;

pub use cache::{CacheConfig, CacheStats, CachedConnectionStats, ConnectionCache, close_quietly};
pub use config::StoredConnection;
pub use health::{PingError, PingResult, ping_connection, ping_with_timeout};
pub use manager::{ConnectionManager, TestFailure, TestOutcome};
pub use reconnect::{BackoffStrategy, RetryPolicy};
pub use storage::ConnectionStore;
