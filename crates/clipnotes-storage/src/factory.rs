//! Storage backend construction from configuration.

use std::sync::Arc;

use clipnotes_core::Config;

use crate::local::LocalStorage;
use crate::s3::S3Storage;
use crate::traits::{Storage, StorageError, StorageResult};

/// Build the configured storage backend. S3 wins when a bucket is configured;
/// otherwise the local filesystem backend is used (development only).
pub fn build_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    if let Some(ref bucket) = config.s3_bucket {
        let storage = S3Storage::new(
            bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint.clone(),
        )?;
        tracing::info!(bucket = %bucket, "Using S3 storage backend");
        return Ok(Arc::new(storage));
    }

    if let Some(ref path) = config.local_storage_path {
        tracing::info!(path = %path, "Using local storage backend");
        return Ok(Arc::new(LocalStorage::new(path.clone())));
    }

    Err(StorageError::ConfigError(
        "No storage backend configured: set S3_BUCKET or LOCAL_STORAGE_PATH".to_string(),
    ))
}
