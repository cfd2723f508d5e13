//! Mongodesk Core - Core abstractions for the MongoDB administration backend
//!
//! This crate provides the fundamental traits and types that all other
//! Mongodesk crates depend on. It defines:
//!
//! - `DatabaseDriver` - Trait for the driver collaborator that dials servers
//! - `Connection` - Trait for live client handles
//! - `InputGate` - Validation applied before any driver call
//! - `SecretCodec` - Encryption of stored connection strings
//! - `AppConfig` - Runtime configuration
//! - The error taxonomy shared by every layer

mod config;
mod connection;
mod driver;
mod error;
pub mod security;
mod verdict;

pub use config::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use security::*;
pub use verdict::*;
