use std::collections::BTreeMap;

use async_trait::async_trait;

use super::error::ClientError;
use super::types::{GroupVersionKind, ObjectRef, ReconcilableObject, ResourceView};

/// Annotation the reconciler watches for on-demand reconciliation.
pub const REQUESTED_AT_ANNOTATION: &str = "reconcile.fluxcd.io/requestedAt";

/// Labels the reconciler stamps on every object it applies.
pub const OWNER_NAME_LABEL: &str = "kustomize.toolkit.fluxcd.io/name";
pub const OWNER_NAMESPACE_LABEL: &str = "kustomize.toolkit.fluxcd.io/namespace";

/// The slice of the cluster API the dev loop needs.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_reconcilable(&self, object: &ObjectRef) -> Result<ReconcilableObject, ClientError>;

    /// Sets (or overwrites) one annotation on the object.
    async fn annotate(&self, object: &ObjectRef, key: &str, value: &str) -> Result<(), ClientError>;

    /// Lists objects of `gvk` in all namespaces carrying every given label.
    async fn list_labelled(
        &self,
        gvk: &GroupVersionKind,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ResourceView>, ClientError>;

    async fn delete(&self, object: &ObjectRef) -> Result<(), ClientError>;
}

/// Label set selecting the objects applied on behalf of `owner`.
pub fn ownership_labels(owner: &ObjectRef) -> BTreeMap<String, String> {
    BTreeMap::from([
        (OWNER_NAME_LABEL.to_string(), owner.name.clone()),
        (OWNER_NAMESPACE_LABEL.to_string(), owner.namespace.clone()),
    ])
}
