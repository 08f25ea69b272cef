//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3-compatible, local filesystem) must implement this
/// trait. The pipeline and API work against it without coupling to backend
/// details.
///
/// **Key format:** keys are owner-scoped, `videos/{owner_id}/{video_id}{suffix}`.
/// See [`crate::keys`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Generate a time-limited URL accepting a single PUT of the given
    /// content type. Only supported by S3-compatible backends; others return
    /// `ConfigError`.
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Generate a time-limited read URL.
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// HEAD check for object existence.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of an object, if it exists.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Server-side upload of a local file. Returns bytes written.
    async fn put_file(
        &self,
        local_path: &Path,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<u64>;

    /// Streaming download into a local file (for large objects).
    async fn get_to_file(&self, storage_key: &str, local_path: &Path) -> StorageResult<u64>;

    /// Delete an object. Idempotent: a missing object is success.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// The backend type.
    fn backend_type(&self) -> StorageBackend;
}
