//! Local development loop for GitOps clusters: mirror a source tree into an
//! S3-compatible bucket, ask the reconciler to re-apply it, and wait until
//! the result is healthy.

pub mod bucket;
pub mod config;
pub mod error;
pub mod fswalk;
pub mod logging;
pub mod reconcile;
pub mod secrets;
pub mod session;
pub mod watch;
pub mod workspace;

pub use bucket::{BucketSynchronizer, MemoryObjectStore, ObjectStore, S3ObjectStore, StoreError, SyncSummary, SyncTarget};
pub use config::{load_config, DevSyncConfig};
pub use error::{ConfigError, DevSyncError, Result, WatchError, WorkspaceError};
pub use fswalk::{IgnoreFilter, PathWalker};
pub use reconcile::{
    ClusterClient, ConvergenceState, KubeHttpClient, ReconcileError, ReconcileTarget,
    ReconciliationDriver,
};
pub use secrets::{resolve_secret, SecretError, SecretSource};
pub use session::{CycleReport, DevSession};
pub use watch::SourceWatcher;
pub use workspace::initialize_target_dir;
