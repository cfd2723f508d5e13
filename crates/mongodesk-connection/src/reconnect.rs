//! Bounded retry for dials
//!
//! Dial failures that the error taxonomy marks as retryable are attempted
//! again with exponentially growing delays; everything else propagates on
//! the first failure.
//!
//! # Example
//!
//! ```ignore
//! use mongodesk_connection::reconnect::{BackoffStrategy, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, BackoffStrategy::new(1_000, 60_000));
//! let conn = policy
//!     .run(|_attempt| driver.connect(connection_string, &options))
//!     .await?;
//! ```

mod backoff;
mod retry;


pub use backoff::BackoffStrategy;
pub use retry::RetryPolicy;
