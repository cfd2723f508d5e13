use mongodesk_core::{FailureCategory, MongodeskError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors with user-friendly messages
///
/// The `Display` text of every variant is safe to show to a user. Variants
/// carrying internal detail expose it only through the envelope's debug
/// field.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    ConnectionFailed {
        category: FailureCategory,
        message: String,
    },

    #[error("Stored connection string could not be decrypted")]
    Decryption(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Server configuration error")]
    Configuration(String),

    #[error("An internal error occurred")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConnectionFailed { category, .. } => category.code(),
            Self::Decryption(_) => "DECRYPTION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP-equivalent status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::ConnectionFailed { category, .. } => match category {
                FailureCategory::Authentication => 401,
                FailureCategory::Authorization => 403,
                FailureCategory::Timeout => 504,
                _ => 503,
            },
            Self::Decryption(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            Self::ConnectionFailed { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// Whether the failure was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    fn debug_detail(&self) -> Option<&str> {
        match self {
            Self::Decryption(detail) | Self::Configuration(detail) | Self::Internal(detail) => {
                Some(detail)
            }
            _ => None,
        }
    }

    /// Build the envelope returned to callers. Internal detail is included
    /// only when `debug` is set.
    pub fn to_envelope(&self, debug: bool) -> ErrorEnvelope {
        let mut details = Map::new();
        if let Some(category) = self.category() {
            details.insert("category".into(), json!(category));
        }
        if debug {
            if let Some(detail) = self.debug_detail() {
                details.insert("debug".into(), json!(detail));
            }
        }

        ErrorEnvelope {
            success: false,
            error: ErrorBody {
                message: self.to_string(),
                code: self.code().to_string(),
                details: (!details.is_empty()).then_some(Value::Object(details)),
            },
        }
    }
}

impl From<MongodeskError> for ServiceError {
    fn from(err: MongodeskError) -> Self {
        match err {
            MongodeskError::Validation(msg) => Self::Validation(msg),
            MongodeskError::ConnectionFailed { category, message } => {
                Self::ConnectionFailed { category, message }
            }
            MongodeskError::Timeout(_) => {
                let category = FailureCategory::Timeout;
                Self::ConnectionFailed {
                    category,
                    message: category.user_message().to_string(),
                }
            }
            MongodeskError::Decryption(msg) => Self::Decryption(msg),
            MongodeskError::NotFound(what) => Self::NotFound(what),
            MongodeskError::Configuration(msg) => Self::Configuration(msg),
            other @ (MongodeskError::Driver(_)
            | MongodeskError::Io(_)
            | MongodeskError::Serialization(_)) => Self::Internal(other.to_string()),
        }
    }
}

/// Standard failure envelope: `{ success: false, error: { message, code, details? } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
