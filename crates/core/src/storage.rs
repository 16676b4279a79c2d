//! Storage trait: the load/save boundary of the pipeline.
//!
//! The batch runner and artifact copier never touch the filesystem directly;
//! they go through this trait so the I/O boundary stays swappable.

use crate::error::IoError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a whole file.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, IoError>;

    /// Write a whole file, creating parent directories as needed.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), IoError>;

    /// Create a directory and all of its parents.
    async fn create_dir_all(&self, path: &Path) -> Result<(), IoError>;

    /// Copy a file, returning the number of bytes copied.
    async fn copy(&self, from: &Path, to: &Path) -> Result<u64, IoError>;

    /// Whether a file or directory exists at `path`.
    async fn exists(&self, path: &Path) -> bool;
}
