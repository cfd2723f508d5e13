//! Input safety and secret handling
//!
//! This module provides the checks applied to every request before it reaches
//! a driver, and the codec used to keep connection strings encrypted at rest.

mod input_gate;
mod redaction;
mod secret_codec;

pub use input_gate::*;
pub use redaction::redact_connection_string;
pub use secret_codec::*;
