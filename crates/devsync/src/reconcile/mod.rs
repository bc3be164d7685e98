//! Driving reconciler objects from "requested" to "healthy".

pub mod cleanup;
pub mod client;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod kube_http;
pub mod types;
pub mod wait;

pub use cleanup::{cleanup_dev_resources, dev_resources, CleanupReport};
pub use client::{
    ownership_labels, ClusterClient, OWNER_NAMESPACE_LABEL, OWNER_NAME_LABEL,
    REQUESTED_AT_ANNOTATION,
};
pub use diagnostics::{collect_diagnostics, inventory_kinds};
pub use driver::{DriverSettings, ReconciliationDriver};
pub use error::{ClientError, Phase, ReconcileError, Result};
pub use kube_http::KubeHttpClient;
pub use types::{
    Condition, ConvergenceState, DiagnosticMessage, GroupVersionKind, Inventory, InventoryEntry,
    InventoryRecord, ObjectRef, ReconcilableObject, ReconcileRequest, ReconcileTarget,
    ResourceView, HEALTHY_CONDITION, READY_CONDITION,
};
pub use wait::{poll_until, WaitError};
