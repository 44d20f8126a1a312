//! Byte-level storage backends for [`KeyedStore`](super::KeyedStore).

use std::{
    collections::HashMap,
    fmt, io,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::SessionStoreError;

/// Durable mapping from session id to encoded payload.
#[async_trait]
pub trait StorageBackend: fmt::Debug + Send + Sync {
    async fn retrieve(&self, id: &str) -> Result<Option<Vec<u8>>, SessionStoreError>;
    async fn store(&self, id: &str, bytes: &[u8]) -> Result<(), SessionStoreError>;
    /// Deleting a missing entry is a no-op, not an error.
    async fn delete(&self, id: &str) -> Result<(), SessionStoreError>;
}

/// Process-local backend for tests and simple single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn retrieve(&self, id: &str) -> Result<Option<Vec<u8>>, SessionStoreError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn store(&self, id: &str, bytes: &[u8]) -> Result<(), SessionStoreError> {
        self.lock().insert(id.to_owned(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SessionStoreError> {
        self.lock().remove(id);
        Ok(())
    }
}

/// One file per session under a configured directory.
///
/// Files are named by the hex SHA-256 of the id, never the raw id: this
/// normalizes length and keeps attacker-supplied ids out of path resolution.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    path: PathBuf,
}

impl FilesystemBackend {
    /// Creates the directory if needed. Fails when it cannot be created or
    /// the path exists but is not a directory.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        if !path.is_dir() {
            std::fs::create_dir_all(&path)?;
        }
        if !path.is_dir() {
            return Err(SessionStoreError::Backend(format!(
                "session path {} is not a directory",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    fn filename(&self, id: &str) -> PathBuf {
        self.path.join(hex::encode(Sha256::digest(id.as_bytes())))
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn retrieve(&self, id: &str) -> Result<Option<Vec<u8>>, SessionStoreError> {
        match tokio::fs::read(self.filename(id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, id: &str, bytes: &[u8]) -> Result<(), SessionStoreError> {
        tokio::fs::write(self.filename(id), bytes).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SessionStoreError> {
        match tokio::fs::remove_file(self.filename(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Remote key-value backend; keys are namespaced as `"{namespace}:{id}"`.
#[cfg(feature = "redis")]
#[derive(Clone)]
pub struct RedisBackend {
    conn: redis::aio::ConnectionManager,
    namespace: String,
}

#[cfg(feature = "redis")]
impl RedisBackend {
    pub fn new(conn: redis::aio::ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    /// Connects to `url` and wraps the connection in a reconnecting manager.
    pub async fn connect(
        url: &str,
        namespace: impl Into<String>,
    ) -> Result<Self, SessionStoreError> {
        let client = redis::Client::open(url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self::new(conn, namespace))
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.namespace, id)
    }
}

#[cfg(feature = "redis")]
impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl StorageBackend for RedisBackend {
    async fn retrieve(&self, id: &str) -> Result<Option<Vec<u8>>, SessionStoreError> {
        let bytes: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.key(id))
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(bytes)
    }

    async fn store(&self, id: &str, bytes: &[u8]) -> Result<(), SessionStoreError> {
        let _: () = redis::cmd("SET")
            .arg(self.key(id))
            .arg(bytes)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SessionStoreError> {
        let _: () = redis::cmd("DEL")
            .arg(self.key(id))
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(())
    }
}
