//! Local filesystem backend for development and tests.
//!
//! Presigned URLs require the S3 backend; the local backend returns
//! `ConfigError` for them and the API refuses to issue upload URLs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;

#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStorage { root: root.into() }
    }

    fn resolve(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.split('/').any(|part| part == "..") {
            return Err(StorageError::BackendError(format!(
                "Invalid storage key: {}",
                storage_key
            )));
        }
        Ok(self.root.join(storage_key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn presigned_put_url(
        &self,
        _storage_key: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::ConfigError(
            "Presigned PUT URLs require the S3 storage backend".to_string(),
        ))
    }

    async fn presigned_get_url(
        &self,
        _storage_key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::ConfigError(
            "Presigned GET URLs require the S3 storage backend".to_string(),
        ))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.resolve(storage_key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.resolve(storage_key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_file(
        &self,
        local_path: &Path,
        storage_key: &str,
        _content_type: &str,
    ) -> StorageResult<u64> {
        let dest = self.resolve(storage_key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(local_path, &dest).await?;
        tracing::debug!(key = %storage_key, size_bytes = bytes, "Local store write");
        Ok(bytes)
    }

    async fn get_to_file(&self, storage_key: &str, local_path: &Path) -> StorageResult<u64> {
        let src = self.resolve(storage_key)?;
        match tokio::fs::copy(&src, local_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
