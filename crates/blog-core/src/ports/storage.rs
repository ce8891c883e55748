//! Blob storage port - where uploaded cover files live.

use async_trait::async_trait;

/// Blob storage trait - abstraction over local disk or object stores.
///
/// Paths are relative, `/`-separated keys such as `uploads/post/cover/a.png`.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `bytes` at `path`, replacing anything already there.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &str) -> bool;

    /// Remove a blob. Missing blobs are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL for a stored path.
    fn url(&self, path: &str) -> String;
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}
