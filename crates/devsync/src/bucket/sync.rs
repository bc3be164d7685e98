//! Full-replace synchronization of a local tree into a bucket.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::store::{ObjectStore, StoreError};
use crate::fswalk::{relative_key, IgnoreFilter, PathWalker, WalkError};

/// Log a progress line every this many uploads.
const PROGRESS_EVERY: usize = 10;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to remove bucket '{bucket}': {source}")]
    RemoveBucket {
        bucket: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to create bucket '{bucket}': {source}")]
    CreateBucket {
        bucket: String,
        #[source]
        source: StoreError,
    },

    #[error("Sync aborted after {uploaded} uploads: {source}")]
    Walk {
        uploaded: usize,
        #[source]
        source: WalkError,
    },
}

impl SyncError {
    /// Files uploaded before the sync was aborted.
    pub fn uploaded(&self) -> usize {
        match self {
            SyncError::Walk { uploaded, .. } => *uploaded,
            _ => 0,
        }
    }
}

/// One local directory mirrored into one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub root: PathBuf,
    pub bucket: String,
}

impl SyncTarget {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }
}

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// Matched by the ignore rules; never sent.
    SkippedIgnored,
    /// The store refused a zero-length file; counts as success.
    SkippedEmpty,
    /// Logged and skipped, the sync carries on.
    Failed(String),
}

/// Aggregate result of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub uploaded: usize,
    pub skipped_ignored: usize,
    pub skipped_empty: usize,
    pub failed: Vec<String>,
}

impl SyncSummary {
    fn record(&mut self, key: &str, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded => {
                self.uploaded += 1;
                if self.uploaded % PROGRESS_EVERY == 0 {
                    log::debug!("Uploaded {} files so far", self.uploaded);
                }
            }
            UploadOutcome::SkippedIgnored => self.skipped_ignored += 1,
            UploadOutcome::SkippedEmpty => self.skipped_empty += 1,
            UploadOutcome::Failed(_) => self.failed.push(key.to_string()),
        }
    }
}

/// Recreates a bucket and repopulates it from a local directory.
pub struct BucketSynchronizer {
    store: Arc<dyn ObjectStore>,
}

impl BucketSynchronizer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Runs one full-replace pass.
    ///
    /// Bucket delete/create failures and walk errors abort the pass; a
    /// failed upload of a single file is logged and skipped.
    ///
    /// # Arguments
    ///
    /// * `target` - Local root and the bucket it is mirrored into
    /// * `filter` - Ignore rules compiled from the root's `.gitignore`
    ///
    /// # Returns
    ///
    /// Per-outcome counts. Hidden and ignored directories never appear in
    /// them; ignored files show up as `skipped_ignored`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use devsync::{BucketSynchronizer, IgnoreFilter, MemoryObjectStore, SyncTarget};
    ///
    /// # async fn run() -> Result<(), devsync::bucket::SyncError> {
    /// let target = SyncTarget::new("./deploy", "dev-bucket");
    /// let filter = IgnoreFilter::build(&target.root);
    /// let sync = BucketSynchronizer::new(Arc::new(MemoryObjectStore::new()));
    ///
    /// let summary = sync.sync(&target, &filter).await?;
    /// println!("{} files uploaded", summary.uploaded);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn sync(
        &self,
        target: &SyncTarget,
        filter: &IgnoreFilter,
    ) -> Result<SyncSummary, SyncError> {
        let bucket = target.bucket.as_str();
        log::info!("Refreshing bucket {} ...", bucket);

        match self.store.remove_bucket_force(bucket).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => log::debug!("Bucket {} did not exist", bucket),
            Err(source) => {
                return Err(SyncError::RemoveBucket {
                    bucket: bucket.to_string(),
                    source,
                })
            }
        }

        self.store
            .make_bucket(bucket)
            .await
            .map_err(|source| SyncError::CreateBucket {
                bucket: bucket.to_string(),
                source,
            })?;

        let mut summary = SyncSummary::default();
        let walker = PathWalker::new(&target.root, filter).with_ignored_files();
        let mut walk = walker.entries();

        while let Some(entry) = walk.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    log::error!("Error syncing directory: {}", source);
                    log::info!("Uploaded {} files", summary.uploaded);
                    return Err(SyncError::Walk {
                        uploaded: summary.uploaded,
                        source,
                    });
                }
            };

            if entry.is_dir() {
                continue;
            }

            let Some(key) = relative_key(&target.root, entry.path()) else {
                continue;
            };

            let outcome = if entry.is_ignored() {
                log::trace!("Skipped ignored file {}", entry.path().display());
                UploadOutcome::SkippedIgnored
            } else {
                self.upload(bucket, &key, entry.path()).await
            };
            summary.record(&key, outcome);
        }

        log::info!("Uploaded {} files", summary.uploaded);
        Ok(summary)
    }

    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> UploadOutcome {
        match self.store.put_file(bucket, key, path).await {
            Ok(()) => UploadOutcome::Uploaded,
            Err(e) if e.is_empty_content() => {
                log::trace!("Skipped empty file {}", path.display());
                UploadOutcome::SkippedEmpty
            }
            Err(e) => {
                log::warn!("Couldn't upload {}: {}", path.display(), e);
                UploadOutcome::Failed(e.to_string())
            }
        }
    }
}
