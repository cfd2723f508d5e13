//! Time-to-live cache of live client handles
//!
//! # Example
//!
//! ```ignore
//! use mongodesk_connection::cache::{CacheConfig, ConnectionCache};
//! use std::time::Duration;
//!
//! let cache = ConnectionCache::new(
//!     CacheConfig::default().with_ttl(Duration::from_secs(300)),
//! );
//! cache.put("primary", connection).await;
//! let handle = cache.get("primary").await;
//! ```

mod cache;
mod config;
mod stats;


pub use cache::{ConnectionCache, close_quietly};
pub use config::CacheConfig;
pub use stats::{CacheStats, CachedConnectionStats};
