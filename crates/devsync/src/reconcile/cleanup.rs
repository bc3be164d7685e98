//! Best-effort teardown of the objects the dev loop owns.

use tracing::{info, warn};

use super::client::ClusterClient;
use super::types::ObjectRef;
use crate::config::ResourceNames;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<ObjectRef>,
    /// Objects that were already gone.
    pub missing: Vec<ObjectRef>,
    /// Objects that could not be deleted, with the reason.
    pub failed: Vec<(ObjectRef, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Objects owned by the dev loop, in deletion order.
pub fn dev_resources(namespace: &str, names: &ResourceNames) -> Vec<ObjectRef> {
    vec![
        ObjectRef::secret(namespace, &names.secret),
        ObjectRef::bucket_source(namespace, &names.source),
        ObjectRef::kustomization(namespace, &names.kustomization),
    ]
}

/// Deletes the credentials secret, the bucket source and the
/// kustomization. Failures are recorded and never stop the sequence.
pub async fn cleanup_dev_resources(
    client: &dyn ClusterClient,
    namespace: &str,
    names: &ResourceNames,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for object in dev_resources(namespace, names) {
        match client.delete(&object).await {
            Ok(()) => {
                info!("Deleted {}", object);
                report.deleted.push(object);
            }
            Err(err) if err.is_not_found() => {
                info!("{} already gone", object);
                report.missing.push(object);
            }
            Err(err) => {
                warn!("Failed to delete {}: {}", object, err);
                report.failed.push((object, err.to_string()));
            }
        }
    }

    report
}
