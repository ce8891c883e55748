//! In-memory blob storage - used in tests and when no upload root is writable.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use blog_core::ports::{BlobStorage, StorageError};

/// Keeps blobs in a map. Contents are lost on restart.
pub struct InMemoryStorage {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    public_url: String,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_public_url("/storage")
    }

    pub fn with_public_url(public_url: impl Into<String>) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Contents of a stored blob.
    pub async fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }

    /// Stored paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStorage for InMemoryStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if path.is_empty() || path.starts_with('/') || path.split('/').any(|part| part == "..") {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        self.blobs
            .write()
            .await
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.blobs.read().await.contains_key(path)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.blobs.write().await.remove(path);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.public_url, path.trim_start_matches('/'))
    }
}
