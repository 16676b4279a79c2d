//! Local filesystem storage backed by `tokio::fs`.

use async_trait::async_trait;
use sessiondigest_core::error::IoError;
use sessiondigest_core::storage::Storage;
use std::path::Path;

/// [`Storage`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, IoError> {
        tokio::fs::read(path).await.map_err(|e| IoError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), IoError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await.map_err(|e| IoError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), IoError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| IoError::CreateDir {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<u64, IoError> {
        tokio::fs::copy(from, to).await.map_err(|e| IoError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
