//! One sync-and-converge iteration of the dev loop.

use std::sync::Arc;

use tracing::{error, info, info_span, Instrument};

use crate::bucket::{BucketSynchronizer, ObjectStore, S3ObjectStore, S3StoreConfig, SyncTarget};
use crate::config::{BucketConfig, DevSyncConfig};
use crate::error::Result;
use crate::fswalk::IgnoreFilter;
use crate::reconcile::{
    cleanup_dev_resources, CleanupReport, ClusterClient, ConvergenceState, DriverSettings,
    KubeHttpClient, ReconcileTarget, ReconciliationDriver,
};

/// Outcome of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub uploaded: usize,
    pub bucket: ConvergenceState,
    pub kustomization: ConvergenceState,
}

pub struct DevSession {
    config: DevSyncConfig,
    client: Arc<dyn ClusterClient>,
    synchronizer: BucketSynchronizer,
    driver: ReconciliationDriver,
}

impl DevSession {
    pub fn new(
        config: DevSyncConfig,
        store: Arc<dyn ObjectStore>,
        client: Arc<dyn ClusterClient>,
    ) -> Self {
        let settings = DriverSettings {
            interval: config.poll_interval(),
            timeout: config.timeout(),
        };
        Self {
            synchronizer: BucketSynchronizer::new(store),
            driver: ReconciliationDriver::new(Arc::clone(&client), settings),
            client,
            config,
        }
    }

    /// Builds an S3 store and a cluster client from `config`.
    pub async fn connect(config: DevSyncConfig) -> Result<Self> {
        let store = S3ObjectStore::new(s3_store_config(&config.bucket)?).await;
        let client = KubeHttpClient::from_config(&config.cluster)?;
        Ok(Self::new(config, Arc::new(store), Arc::new(client)))
    }

    pub fn config(&self) -> &DevSyncConfig {
        &self.config
    }

    pub fn bucket_target(&self) -> ReconcileTarget {
        ReconcileTarget::bucket_source(&self.config.namespace, &self.config.resources.source)
    }

    pub fn kustomization_target(&self) -> ReconcileTarget {
        ReconcileTarget::kustomization(
            &self.config.namespace,
            &self.config.resources.kustomization,
        )
    }

    /// Sync, then reconcile the bucket source, then the kustomization.
    ///
    /// The ignore rules are re-read every cycle so edits to the ignore file
    /// take effect on the next change.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let span = info_span!("cycle", bucket = %self.config.bucket.name);

        self.cycle().instrument(span).await
    }

    async fn cycle(&self) -> Result<CycleReport> {
        let root = &self.config.root_dir;
        let filter = IgnoreFilter::build(root);

        let summary = self
            .synchronizer
            .sync(&SyncTarget::new(root, &self.config.bucket.name), &filter)
            .await?;
        info!(
            uploaded = summary.uploaded,
            failed = summary.failed.len(),
            "Synced {}",
            root.display()
        );

        let bucket = self.driver.reconcile(&self.bucket_target()).await?;

        let kustomization = match self.driver.reconcile(&self.kustomization_target()).await {
            Ok(state) => state,
            Err(err) => {
                if !err.messages().is_empty() {
                    error!(
                        "{} reported {} unhealthy objects",
                        self.kustomization_target(),
                        err.messages().len()
                    );
                }
                return Err(err.into());
            }
        };

        Ok(CycleReport {
            uploaded: summary.uploaded,
            bucket,
            kustomization,
        })
    }

    /// Deletes the secret, bucket source and kustomization.
    pub async fn cleanup(&self) -> CleanupReport {
        cleanup_dev_resources(
            self.client.as_ref(),
            &self.config.namespace,
            &self.config.resources,
        )
        .await
    }
}

/// Resolves credentials and the endpoint URL for the S3 client.
pub fn s3_store_config(bucket: &BucketConfig) -> Result<S3StoreConfig> {
    Ok(S3StoreConfig {
        endpoint: endpoint_url(&bucket.endpoint, bucket.insecure),
        region: bucket.region.clone(),
        access_key: bucket.access_key.resolve("bucket access key")?,
        secret_key: bucket.secret_key.resolve("bucket secret key")?,
    })
}

/// Adds a scheme to bare `host:port` endpoints: `http` when insecure.
pub fn endpoint_url(endpoint: &str, insecure: bool) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else if insecure {
        format!("http://{}", endpoint)
    } else {
        format!("https://{}", endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(endpoint_url("localhost:9000", true), "http://localhost:9000");
        assert_eq!(endpoint_url("minio.local", false), "https://minio.local");
        assert_eq!(endpoint_url("http://localhost:9000", false), "http://localhost:9000");
    }

    #[test]
    fn test_default_bucket_credentials_resolve() {
        let config = s3_store_config(&BucketConfig::default()).unwrap();
        assert_eq!(config.access_key.expose_secret(), "user");
        assert_eq!(config.region, "us-east-1");
    }
}
