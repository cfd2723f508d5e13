//! Error types for Mongodesk

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for Mongodesk operations
#[derive(Error, Debug)]
pub enum MongodeskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{message}")]
    ConnectionFailed {
        category: FailureCategory,
        message: String,
    },

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MongodeskError {
    /// Build a classified connection failure carrying the category's
    /// user-facing message.
    pub fn connection_failed(category: FailureCategory) -> Self {
        Self::ConnectionFailed {
            category,
            message: category.user_message().to_string(),
        }
    }

    /// Whether a dial that produced this error is worth attempting again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::Timeout(_) => true,
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// The failure category for connection errors, if any
    pub fn failure_category(&self) -> Option<FailureCategory> {
        match self {
            Self::ConnectionFailed { category, .. } => Some(*category),
            Self::Timeout(_) => Some(FailureCategory::Timeout),
            _ => None,
        }
    }
}

/// Result type alias for Mongodesk operations
pub type Result<T> = std::result::Result<T, MongodeskError>;

/// Classification of a failed dial, surfaced to callers so they can react
/// differently (prompt for credentials, suggest checking firewall rules, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Authentication,
    Authorization,
    Network,
    Timeout,
    Refused,
    Generic,
}

impl FailureCategory {
    /// Human-readable message shown to the user. Never includes the
    /// connection string or raw driver output.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Authentication => {
                "Authentication failed. Please check your username and password."
            }
            Self::Authorization => {
                "Not authorized. The user lacks the privileges required for this operation."
            }
            Self::Network => {
                "Unable to resolve or reach the host. Please check the hostname and your network connection."
            }
            Self::Timeout => {
                "Connection timed out. Please check that the server is running and reachable."
            }
            Self::Refused => {
                "Connection refused. Please check the host, port, and firewall rules."
            }
            Self::Generic => "Failed to connect to the database server.",
        }
    }

    /// Stable machine-readable code for error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication => "AUTHENTICATION_FAILED",
            Self::Authorization => "AUTHORIZATION_FAILED",
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "CONNECTION_TIMEOUT",
            Self::Refused => "CONNECTION_REFUSED",
            Self::Generic => "CONNECTION_FAILED",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Refused => "refused",
            Self::Generic => "generic",
        }
    }

    /// Classify a low-level failure from its message text.
    ///
    /// Drivers classify by error kind first and fall back to this when the
    /// kind alone is not conclusive (server selection errors wrap the real
    /// cause in their message).
    pub fn from_message(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();

        if msg.contains("not authorized") || msg.contains("unauthorized") {
            Self::Authorization
        } else if msg.contains("authentication failed")
            || msg.contains("auth failed")
            || msg.contains("scram")
            || msg.contains("bad auth")
        {
            Self::Authentication
        } else if msg.contains("connection refused")
            || msg.contains("econnrefused")
            || msg.contains("os error 111")
        {
            Self::Refused
        } else if msg.contains("enotfound")
            || msg.contains("getaddrinfo")
            || msg.contains("failed to lookup address")
            || msg.contains("dns")
            || msg.contains("no such host")
            || msg.contains("network is unreachable")
            || msg.contains("host unreachable")
        {
            Self::Network
        } else if msg.contains("timed out") || msg.contains("timeout") {
            Self::Timeout
        } else {
            Self::Generic
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authentication() {
        assert_eq!(
            FailureCategory::from_message("Authentication failed."),
            FailureCategory::Authentication
        );
        assert_eq!(
            FailureCategory::from_message("SCRAM failure: bad credentials"),
            FailureCategory::Authentication
        );
    }

    #[test]
    fn test_classify_authorization() {
        assert_eq!(
            FailureCategory::from_message("not authorized on admin to execute command"),
            FailureCategory::Authorization
        );
    }

    #[test]
    fn test_classify_network() {
        assert_eq!(
            FailureCategory::from_message("getaddrinfo ENOTFOUND db.example.invalid"),
            FailureCategory::Network
        );
        assert_eq!(
            FailureCategory::from_message("failed to lookup address information"),
            FailureCategory::Network
        );
    }

    #[test]
    fn test_classify_refused_and_timeout() {
        assert_eq!(
            FailureCategory::from_message("Connection refused (os error 111)"),
            FailureCategory::Refused
        );
        assert_eq!(
            FailureCategory::from_message("Server selection timeout: No available servers"),
            FailureCategory::Timeout
        );
    }

    #[test]
    fn test_classify_generic() {
        assert_eq!(
            FailureCategory::from_message("something unexpected"),
            FailureCategory::Generic
        );
    }

    #[test]
    fn test_connection_failed_uses_category_message() {
        let err = MongodeskError::connection_failed(FailureCategory::Refused);
        assert_eq!(err.to_string(), FailureCategory::Refused.user_message());
        assert_eq!(err.failure_category(), Some(FailureCategory::Refused));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let err = MongodeskError::Validation("bad".into());
        assert!(!err.is_retryable());
        assert_eq!(err.failure_category(), None);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&FailureCategory::Authentication).unwrap();
        assert_eq!(json, "\"authentication\"");
    }
}
