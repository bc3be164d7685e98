use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::store::{ObjectStore, StoreError};

type Buckets = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// An in-process [`ObjectStore`], used for dry runs and tests.
///
/// Mirrors the behaviour of the S3 store: zero-length uploads are refused
/// and creating an existing bucket fails.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<Buckets>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.read().contains_key(bucket)
    }

    /// Sorted keys of a bucket; empty if it does not exist.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.read()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.read().get(bucket)?.get(key).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, Buckets> {
        self.buckets.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Buckets> {
        self.buckets.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn remove_bucket_force(&self, bucket: &str) -> Result<(), StoreError> {
        match self.write().remove(bucket) {
            Some(_) => Ok(()),
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.write();
        if buckets.contains_key(bucket) {
            return Err(StoreError::BucketAlreadyExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn put_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), StoreError> {
        let data = tokio::fs::read(source)
            .await
            .map_err(|e| StoreError::ReadFile {
                path: source.to_path_buf(),
                source: e,
            })?;

        if data.is_empty() {
            return Err(StoreError::EmptyContent(key.to_string()));
        }

        let mut buckets = self.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        objects.insert(key.to_string(), data);
        Ok(())
    }
}
