//! MongoDB driver for Mongodesk
//!
//! This crate provides the driver collaborator used by the connection
//! manager: it dials MongoDB servers, verifies them with a ping, and
//! classifies dial failures into the categories surfaced to users.
//!
//! # Example
//!
//! ```ignore
//! use mongodesk_driver_mongodb::MongoDbDriver;
//! use mongodesk_core::{DatabaseDriver, DialOptions};
//!
//! let driver = MongoDbDriver::new();
//! let conn = driver
//!     .connect("mongodb://localhost:27017", &DialOptions::default())
//!     .await?;
//! let databases = conn.list_databases().await?;
//! ```

mod driver;
#[cfg(test)]
mod driver_tests;

pub use driver::*;
