use chrono::{DateTime, Utc};
use mongodesk_connection::StoredConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored connection profile as shown to callers. Never carries the
/// connection string in any form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Whether a live client is currently cached
    pub active: bool,
}

impl ConnectionSummary {
    pub fn from_stored(stored: &StoredConnection, active: bool) -> Self {
        Self {
            id: stored.id,
            name: stored.name.clone(),
            color: stored.color.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            last_connected_at: stored.last_connected_at,
            active,
        }
    }
}

/// Live status of one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connection_id: String,
    /// A client is cached for this id
    pub active: bool,
    /// Milliseconds since the cached client was last used
    pub idle_ms: Option<u64>,
}
