//! Filesystem-backed blob storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};

use blog_core::ports::{BlobStorage, StorageError};

/// Stores blobs under a root directory and serves them below a public URL base.
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalDiskStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative key onto the root, rejecting anything that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        if path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalDiskStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let absolute = self.resolve(path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(bytes).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        tracing::debug!(path = %path, size = bytes.len(), "Stored blob");
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(absolute) => fs::try_exists(absolute).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let absolute = self.resolve(path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => {
                tracing::debug!(path = %path, "Removed blob");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.public_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> LocalDiskStorage {
        let root = std::env::temp_dir().join(format!("blog-storage-{}", uuid::Uuid::new_v4()));
        LocalDiskStorage::new(root, "/storage/").unwrap()
    }

    #[tokio::test]
    async fn test_put_exists_delete() {
        let storage = temp_storage();
        let path = "uploads/post/cover/a_1.png";

        storage.put(path, b"png").await.unwrap();
        assert!(storage.exists(path).await);
        assert_eq!(
            std::fs::read(storage.root().join(path)).unwrap(),
            b"png".to_vec()
        );

        storage.delete(path).await.unwrap();
        assert!(!storage.exists(path).await);

        std::fs::remove_dir_all(storage.root()).unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let storage = temp_storage();
        assert!(storage.delete("uploads/post/cover/missing.png").await.is_ok());
        std::fs::remove_dir_all(storage.root()).unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let storage = temp_storage();
        assert!(matches!(
            storage.put("../outside.png", b"x").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.delete("/etc/passwd").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(!storage.exists("../outside.png").await);
        std::fs::remove_dir_all(storage.root()).unwrap();
    }

    #[test]
    fn test_url_joins_public_base() {
        let storage = temp_storage();
        assert_eq!(
            storage.url("uploads/post/cover/a.png"),
            "/storage/uploads/post/cover/a.png"
        );
        std::fs::remove_dir_all(storage.root()).unwrap();
    }
}
