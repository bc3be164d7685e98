use std::path::PathBuf;
use thiserror::Error;

use crate::bucket::{StoreError, SyncError};
use crate::reconcile::{ClientError, ReconcileError};
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum DevSyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClientError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid bucket name '{name}': {reason}")]
    InvalidBucketName { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create watcher: {0}")]
    CreateWatcher(String),

    #[error("Failed to watch '{path}': {message}")]
    Register { path: PathBuf, message: String },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] crate::fswalk::WalkError),
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Failed to inspect '{path}': {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target must be a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Error creating entrypoint kustomization.yaml in '{path}': {source}")]
    WriteEntrypoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DevSyncError>;
