//! The object store seam used by the synchronizer.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Bucket '{0}' does not exist")]
    NoSuchBucket(String),

    #[error("Bucket '{0}' already exists")]
    BucketAlreadyExists(String),

    /// The store refused a zero-length payload.
    #[error("Refusing to upload empty content for '{0}'")]
    EmptyContent(String),

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object store request failed: {0}")]
    Request(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NoSuchBucket(_))
    }

    pub fn is_empty_content(&self) -> bool {
        matches!(self, StoreError::EmptyContent(_))
    }
}

/// Minimal bucket API needed for full-replace synchronization.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Deletes the bucket and everything in it.
    ///
    /// Returns [`StoreError::NoSuchBucket`] when there is nothing to delete.
    async fn remove_bucket_force(&self, bucket: &str) -> Result<(), StoreError>;

    async fn make_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Uploads the file at `source` under `key`.
    ///
    /// Returns [`StoreError::EmptyContent`] for zero-length files.
    async fn put_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), StoreError>;
}
