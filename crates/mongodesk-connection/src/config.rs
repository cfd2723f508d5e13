//! Stored connection profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named connection profile.
///
/// The connection string is held only in its encrypted `iv:ciphertext`
/// form; the plaintext exists transiently while testing or dialing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConnection {
    /// Unique identifier, also used as the cache key
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Optional color tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Encrypted connection string
    pub connection_string_cipher: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl StoredConnection {
    /// Create a new profile from an already-encrypted connection string
    pub fn new(name: impl Into<String>, connection_string_cipher: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: None,
            connection_string_cipher: connection_string_cipher.into(),
            created_at: now,
            updated_at: now,
            last_connected_at: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Key used for this profile's cached handle
    pub fn cache_key(&self) -> String {
        self.id.to_string()
    }

    /// Bump `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record a successful dial
    pub fn mark_connected(&mut self) {
        self.last_connected_at = Some(Utc::now());
    }
}
