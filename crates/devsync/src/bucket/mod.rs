//! Mirroring a local tree into an S3-compatible bucket.

pub mod memory;
pub mod s3;
pub mod store;
pub mod sync;

pub use memory::MemoryObjectStore;
pub use s3::{S3ObjectStore, S3StoreConfig};
pub use store::{ObjectStore, StoreError};
pub use sync::{BucketSynchronizer, SyncError, SyncSummary, SyncTarget, UploadOutcome};
