//! JSON file store for connection profiles
//!
//! All profiles live in a single JSON array on disk. Writes go to a sibling
//! temporary file that is renamed over the original, so a crash mid-write
//! leaves the previous contents intact.

use std::path::{Path, PathBuf};

use mongodesk_core::{MongodeskError, Result, SecretCodec};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::StoredConnection;

/// Persistent store of [`StoredConnection`] profiles
pub struct ConnectionStore {
    path: PathBuf,
    /// In-memory copy of the file, in insertion order
    connections: RwLock<Vec<StoredConnection>>,
    /// Serializes mutate-then-persist sequences
    write_lock: tokio::sync::Mutex<()>,
}

impl ConnectionStore {
    /// Open the store at `path`, starting empty if the file does not exist
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let connections = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => serde_json::from_str::<Vec<StoredConnection>>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no connection store yet, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(count = connections.len(), "loaded stored connections");
        Ok(Self {
            path,
            connections: RwLock::new(connections),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: Uuid) -> Option<StoredConnection> {
        self.connections.read().iter().find(|c| c.id == id).cloned()
    }

    pub fn list(&self) -> Vec<StoredConnection> {
        self.connections.read().clone()
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Add a new profile
    pub async fn insert(&self, connection: StoredConnection) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        {
            let mut connections = self.connections.write();
            if connections.iter().any(|c| c.id == connection.id) {
                return Err(MongodeskError::Validation(format!(
                    "Connection {} already exists",
                    connection.id
                )));
            }
            connections.push(connection);
        }
        self.persist().await
    }

    /// Replace an existing profile
    pub async fn update(&self, connection: StoredConnection) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        {
            let mut connections = self.connections.write();
            let slot = connections
                .iter_mut()
                .find(|c| c.id == connection.id)
                .ok_or_else(|| not_found(connection.id))?;
            *slot = connection;
        }
        self.persist().await
    }

    /// Record a successful dial on the current version of a profile,
    /// leaving every other field as it is in the store
    pub async fn mark_connected(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        {
            let mut connections = self.connections.write();
            connections
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| not_found(id))?
                .mark_connected();
        }
        self.persist().await
    }

    /// Remove a profile, returning it
    pub async fn remove(&self, id: Uuid) -> Result<StoredConnection> {
        let _guard = self.write_lock.lock().await;
        let removed = {
            let mut connections = self.connections.write();
            let index = connections
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| not_found(id))?;
            connections.remove(index)
        };
        self.persist().await?;
        Ok(removed)
    }

    /// Encrypt any profile whose connection string was stored in plaintext
    /// by an older version. Returns the number of migrated profiles.
    pub async fn migrate_plaintext(&self, codec: &SecretCodec) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let migrated = {
            let mut connections = self.connections.write();
            let mut migrated = 0;
            for connection in connections.iter_mut() {
                if SecretCodec::is_encrypted_format(&connection.connection_string_cipher) {
                    continue;
                }
                connection.connection_string_cipher =
                    codec.encrypt(&connection.connection_string_cipher)?;
                connection.touch();
                migrated += 1;
                tracing::info!(connection_id = %connection.id, "encrypted plaintext connection string");
            }
            migrated
        };

        if migrated > 0 {
            self.persist().await?;
        }
        Ok(migrated)
    }

    async fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.connections.read())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "persisted stored connections");
        Ok(())
    }
}

fn not_found(id: Uuid) -> MongodeskError {
    MongodeskError::NotFound(format!("Connection {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn codec() -> SecretCodec {
        SecretCodec::new(&[7u8; 32]).unwrap()
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConnectionStore::open(dir.path().join("connections.json"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_insert_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("connections.json");

        let store = ConnectionStore::open(&path).await.unwrap();
        let conn = StoredConnection::new("Local", codec().encrypt("mongodb://localhost").unwrap());
        store.insert(conn.clone()).await.unwrap();

        let reloaded = ConnectionStore::open(&path).await.unwrap();
        assert_eq!(reloaded.list(), vec![conn]);
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConnectionStore::open(dir.path().join("c.json")).await.unwrap();
        let conn = StoredConnection::new("Local", "aa:bb");

        store.insert(conn.clone()).await.unwrap();
        assert!(matches!(
            store.insert(conn).await,
            Err(MongodeskError::Validation(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConnectionStore::open(dir.path().join("c.json")).await.unwrap();
        let mut conn = StoredConnection::new("Local", "aa:bb");
        store.insert(conn.clone()).await.unwrap();

        conn.name = "Renamed".into();
        store.update(conn.clone()).await.unwrap();
        assert_eq!(store.get(conn.id).unwrap().name, "Renamed");

        let removed = store.remove(conn.id).await.unwrap();
        assert_eq!(removed.id, conn.id);
        assert!(store.get(conn.id).is_none());
        assert!(matches!(
            store.remove(conn.id).await,
            Err(MongodeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_connected_keeps_newer_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConnectionStore::open(dir.path().join("c.json")).await.unwrap();
        let snapshot = StoredConnection::new("Local", "aa:bb");
        store.insert(snapshot.clone()).await.unwrap();

        let mut renamed = snapshot.clone();
        renamed.name = "Renamed".into();
        renamed.connection_string_cipher = "cc:dd".into();
        store.update(renamed).await.unwrap();

        store.mark_connected(snapshot.id).await.unwrap();

        let current = store.get(snapshot.id).unwrap();
        assert_eq!(current.name, "Renamed");
        assert_eq!(current.connection_string_cipher, "cc:dd");
        assert!(current.last_connected_at.is_some());
        assert!(matches!(
            store.mark_connected(Uuid::new_v4()).await,
            Err(MongodeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConnectionStore::open(dir.path().join("c.json")).await.unwrap();
        let result = store.update(StoredConnection::new("Ghost", "aa:bb")).await;
        assert!(matches!(result, Err(MongodeskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        assert!(matches!(
            ConnectionStore::open(&path).await,
            Err(MongodeskError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_migrate_plaintext_encrypts_legacy_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        let codec = codec();

        let legacy = StoredConnection::new("Legacy", "mongodb://admin:pw@localhost:27017");
        let modern = StoredConnection::new("Modern", codec.encrypt("mongodb://db:27017").unwrap());
        tokio::fs::write(
            &path,
            serde_json::to_string(&vec![legacy.clone(), modern.clone()]).unwrap(),
        )
        .await
        .unwrap();

        let store = ConnectionStore::open(&path).await.unwrap();
        assert_eq!(store.migrate_plaintext(&codec).await.unwrap(), 1);

        let migrated = store.get(legacy.id).unwrap();
        assert!(SecretCodec::is_encrypted_format(&migrated.connection_string_cipher));
        assert_eq!(
            codec.decrypt(&migrated.connection_string_cipher).unwrap(),
            "mongodb://admin:pw@localhost:27017"
        );
        assert_eq!(store.get(modern.id).unwrap(), modern);

        let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!on_disk.contains("admin:pw"));

        assert_eq!(store.migrate_plaintext(&codec).await.unwrap(), 0);
    }
}
