//! Validation verdicts

use serde::{Deserialize, Serialize};

use crate::{MongodeskError, Result};

/// Outcome of a pure validation function.
///
/// Validation never errors; callers inspect the verdict and decide how to
/// reject the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The rejection reason, if the verdict is invalid
    pub fn reason(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Convert into a `Result`, mapping rejection to a validation error
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(MongodeskError::Validation(
                self.error.unwrap_or_else(|| "Invalid input".to_string()),
            ))
        }
    }
}
