use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevSyncConfig {
    /// Namespace holding the bucket source and the kustomization.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Local directory mirrored into the bucket.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub bucket: BucketConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub resources: ResourceNames,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DevSyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DevSyncConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            root_dir: default_root_dir(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            bucket: BucketConfig::default(),
            cluster: ClusterConfig::default(),
            resources: ResourceNames::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_namespace() -> String {
    "flux-system".to_string()
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout_secs() -> u64 {
    300
}

// 1.5s, the reconciler's own status update cadence is about that fast
fn default_poll_interval_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketConfig {
    #[serde(default = "default_bucket_name")]
    pub name: String,
    /// S3-compatible endpoint, e.g. `http://localhost:9000`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default = "default_access_key")]
    pub access_key: SecretSource,
    #[serde(default = "default_secret_key")]
    pub secret_key: SecretSource,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: default_bucket_name(),
            endpoint: default_endpoint(),
            region: default_region(),
            insecure: false,
            access_key: default_access_key(),
            secret_key: default_secret_key(),
        }
    }
}

fn default_bucket_name() -> String {
    "dev-bucket".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

// The dev bucket server accepts any credentials.
fn default_access_key() -> SecretSource {
    SecretSource::inline("user")
}

fn default_secret_key() -> SecretSource {
    SecretSource::inline("doesn't matter")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// API server base URL.
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default)]
    pub token: SecretSource,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            token: SecretSource::default(),
            insecure_skip_tls_verify: false,
        }
    }
}

fn default_server() -> String {
    "https://127.0.0.1:6443".to_string()
}

/// Names of the remote objects the dev loop drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNames {
    #[serde(default = "default_secret_name")]
    pub secret: String,
    #[serde(default = "default_source_name")]
    pub source: String,
    #[serde(default = "default_kustomization_name")]
    pub kustomization: String,
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            secret: default_secret_name(),
            source: default_source_name(),
            kustomization: default_kustomization_name(),
        }
    }
}

fn default_secret_name() -> String {
    "dev-bucket-credentials".to_string()
}

fn default_source_name() -> String {
    "dev-bucket".to_string()
}

fn default_kustomization_name() -> String {
    "dev-ks".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
