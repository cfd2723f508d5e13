//! Connection lifecycle service
//!
//! Orchestrates stored connection profiles and the live clients dialed for
//! them. Plaintext connection strings only ever exist inside a single call.

use std::collections::HashMap;
use std::sync::Arc;

use mongodesk_connection::{
    CacheStats, ConnectionManager, ConnectionStore, StoredConnection, TestOutcome,
};
use mongodesk_core::{Connection, DatabaseInfo, SecretCodec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::view_models::{ConnectionStatus, ConnectionSummary};

/// Input for saving a new connection profile
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConnectionRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    pub connection_string: String,
}

/// Partial update of a connection profile; absent fields are left as they are
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConnectionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub connection_string: Option<String>,
}

impl std::fmt::Debug for SaveConnectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveConnectionRequest")
            .field("name", &self.name)
            .field("color", &self.color)
            .field("connection_string", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for UpdateConnectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateConnectionRequest")
            .field("name", &self.name)
            .field("color", &self.color)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Service for connection lifecycle management
///
/// This service:
/// - Tests connection strings with throwaway clients
/// - Saves profiles only after a successful test, encrypting the string
/// - Dials and caches clients for saved profiles on demand
/// - Closes live clients before their profile changes or disappears
///
/// Dials, updates and deletes of the same profile never interleave, so a
/// client dialed with a superseded connection string cannot outlive the
/// update that replaced it.
pub struct ConnectionService {
    manager: Arc<ConnectionManager>,
    store: Arc<ConnectionStore>,
    codec: Arc<SecretCodec>,
    /// One lock per profile id, held across each dial or mutation
    profile_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConnectionService {
    pub fn new(
        manager: Arc<ConnectionManager>,
        store: Arc<ConnectionStore>,
        codec: Arc<SecretCodec>,
    ) -> Self {
        Self {
            manager,
            store,
            codec,
            profile_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Test a connection string without saving or caching anything
    pub async fn test(&self, connection_string: &str) -> TestOutcome {
        self.manager.test_connection(connection_string).await
    }

    /// Test, encrypt and persist a new profile
    #[tracing::instrument(skip(self, request), fields(connection_name = %request.name))]
    pub async fn save(&self, request: SaveConnectionRequest) -> ServiceResult<ConnectionSummary> {
        let name = validate_profile_name(&request.name)?;

        self.manager
            .test_connection(&request.connection_string)
            .await
            .into_result()?;

        let cipher = self.codec.encrypt(&request.connection_string)?;
        let mut stored = StoredConnection::new(name, cipher);
        stored.color = request.color;
        self.store.insert(stored.clone()).await?;

        tracing::info!(connection_id = %stored.id, "connection saved");
        Ok(ConnectionSummary::from_stored(&stored, false))
    }

    /// Update a profile. A changed connection string is re-tested and any
    /// live client for the old string is closed.
    #[tracing::instrument(skip(self, request), fields(connection_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateConnectionRequest,
    ) -> ServiceResult<ConnectionSummary> {
        let lock = self.profile_lock(id);
        let _guard = lock.lock().await;
        let mut stored = self.stored(id)?;

        if let Some(name) = &request.name {
            stored.name = validate_profile_name(name)?;
        }
        if request.color.is_some() {
            stored.color = request.color;
        }

        let mut string_changed = false;
        if let Some(connection_string) = &request.connection_string {
            let unchanged = match self.codec.decrypt(&stored.connection_string_cipher) {
                Ok(current) => &current == connection_string,
                Err(e) => {
                    tracing::warn!(error = %e, "stored connection string is unreadable, replacing it");
                    false
                }
            };
            if !unchanged {
                self.manager
                    .test_connection(connection_string)
                    .await
                    .into_result()?;
                stored.connection_string_cipher = self.codec.encrypt(connection_string)?;
                string_changed = true;
            }
        }

        stored.touch();
        self.store.update(stored.clone()).await?;

        if string_changed && self.manager.close_connection(&stored.cache_key()).await {
            tracing::info!("closed client dialed with the previous connection string");
        }

        Ok(ConnectionSummary::from_stored(
            &stored,
            self.manager.is_active(&stored.cache_key()),
        ))
    }

    /// Close any live client, then remove the profile
    #[tracing::instrument(skip(self), fields(connection_id = %id))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let lock = self.profile_lock(id);
        let _guard = lock.lock().await;
        let stored = self.stored(id)?;
        self.manager.close_connection(&stored.cache_key()).await;
        self.store.remove(id).await?;
        self.profile_locks.lock().remove(&id);
        tracing::info!("connection deleted");
        Ok(())
    }

    /// Get or dial the live client for a saved profile
    #[tracing::instrument(skip(self), fields(connection_id = %id))]
    pub async fn connect(&self, id: Uuid) -> ServiceResult<Arc<dyn Connection>> {
        let key = id.to_string();
        if let Some(conn) = self.manager.get_cached(&key).await {
            return Ok(conn);
        }

        let lock = self.profile_lock(id);
        let _guard = lock.lock().await;
        let stored = self.stored(id)?;
        let connection_string = self.codec.decrypt(&stored.connection_string_cipher)?;
        let conn = self
            .manager
            .get_or_create_client(&key, &connection_string)
            .await?;

        if let Err(e) = self.store.mark_connected(id).await {
            tracing::warn!(error = %e, "failed to record last connection time");
        }
        Ok(conn)
    }

    /// Close the live client for a profile and dial a fresh one
    #[tracing::instrument(skip(self), fields(connection_id = %id))]
    pub async fn reconnect(&self, id: Uuid) -> ServiceResult<Arc<dyn Connection>> {
        let lock = self.profile_lock(id);
        let _guard = lock.lock().await;
        let stored = self.stored(id)?;
        let connection_string = self.codec.decrypt(&stored.connection_string_cipher)?;
        Ok(self
            .manager
            .reconnect(&stored.cache_key(), &connection_string)
            .await?)
    }

    /// Close the live client for a profile. Returns whether one was open.
    pub async fn disconnect(&self, id: Uuid) -> bool {
        self.manager.close_connection(&id.to_string()).await
    }

    /// List the databases visible through a profile's live client
    pub async fn list_databases(&self, id: Uuid) -> ServiceResult<Vec<DatabaseInfo>> {
        let conn = self.connect(id).await?;
        Ok(conn.list_databases().await?)
    }

    /// Probe the live client for a profile; `false` if none is open
    pub async fn ping(&self, id: Uuid) -> bool {
        self.manager.ping(&id.to_string()).await
    }

    pub fn status(&self, id: Uuid) -> ConnectionStatus {
        let key = id.to_string();
        let idle_ms = self
            .manager
            .stats()
            .connection(&key)
            .map(|entry| entry.age_ms);
        ConnectionStatus {
            active: self.manager.is_active(&key),
            connection_id: key,
            idle_ms,
        }
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<ConnectionSummary> {
        let stored = self.stored(id)?;
        Ok(ConnectionSummary::from_stored(
            &stored,
            self.manager.is_active(&stored.cache_key()),
        ))
    }

    pub fn list(&self) -> Vec<ConnectionSummary> {
        self.store
            .list()
            .iter()
            .map(|stored| {
                ConnectionSummary::from_stored(stored, self.manager.is_active(&stored.cache_key()))
            })
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.manager.stats()
    }

    /// Close every live client and stop background work
    pub async fn shutdown(&self) {
        let closed = self.manager.close_all().await;
        tracing::info!(closed, "connection service shut down");
    }

    fn profile_lock(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.profile_locks.lock().entry(id).or_default().clone()
    }

    fn stored(&self, id: Uuid) -> ServiceResult<StoredConnection> {
        self.store
            .get(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Connection {}", id)))
    }
}

fn validate_profile_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation(
            "Connection name is required".to_string(),
        ));
    }
    if name.chars().count() > 100 {
        return Err(ServiceError::Validation(
            "Connection name cannot exceed 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}
