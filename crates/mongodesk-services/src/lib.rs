//! Mongodesk Services Layer
//!
//! This crate provides the service layer that request handlers call into.
//! Services orchestrate connection profiles, live clients and input checks,
//! and convert every failure into a stable error envelope.
//!
//! # Architecture
//!
//! ```text
//! Transport (mongodesk-cli, or any HTTP layer)
//!     ↓
//! Service Layer (mongodesk-services) ← This crate
//!     ↓
//! Domain Layer (mongodesk-connection)
//!     ↓
//! Infrastructure Layer (mongodesk-core, mongodesk-driver-mongodb)
//! ```
//!
//! # Services
//!
//! - [`ConnectionService`] - Stored connection profiles and live client lifecycle
//! - [`QueryGuard`] - Validation of queries, documents and names before a driver call

mod connection_service;
mod error;
mod query_service;
mod view_models;

pub use connection_service::{ConnectionService, SaveConnectionRequest, UpdateConnectionRequest};
pub use error::{ErrorBody, ErrorEnvelope, ServiceError, ServiceResult};
pub use query_service::{FindRequest, PreparedQuery, QueryGuard, QueryMode};
pub use view_models::{ConnectionStatus, ConnectionSummary};
