//! Full dev-loop cycles: sync, then bucket source, then kustomization.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fakes::dependent;
use common::{FakeCluster, FakeObject, FlakyStore, TestHarness};
use devsync::bucket::MemoryObjectStore;
use devsync::reconcile::{ConvergenceState, ObjectRef, HEALTHY_CONDITION, READY_CONDITION};
use devsync::{initialize_target_dir, DevSession, DevSyncError, ReconcileError};

const NS: &str = "flux-system";
const TICK: Duration = common::harness::POLL_INTERVAL;

fn healthy_cluster() -> Arc<FakeCluster> {
    let cluster = Arc::new(FakeCluster::new());
    cluster.insert(
        ObjectRef::bucket_source(NS, "dev-bucket"),
        FakeObject::converging(READY_CONDITION, TICK, TICK * 2),
    );
    cluster.insert(
        ObjectRef::kustomization(NS, "dev-ks"),
        FakeObject::converging(HEALTHY_CONDITION, TICK, TICK * 3),
    );
    cluster
}

#[tokio::test(start_paused = true)]
async fn test_cycle_syncs_then_reconciles_in_order() {
    let harness = TestHarness::new();
    assert!(initialize_target_dir(&harness.root).unwrap());
    harness.write_text(".gitignore", "*.swp\n");
    harness.write_text("apps/web.yaml", "kind: Deployment\n");
    harness.write_text("apps/.web.yaml.swp", "junk");

    let store = Arc::new(MemoryObjectStore::new());
    let cluster = healthy_cluster();
    let session = DevSession::new(
        harness.config(Duration::from_secs(60)),
        store.clone(),
        cluster.clone(),
    );

    let report = session.run_cycle().await.unwrap();

    assert_eq!(report.uploaded, 3);
    assert_eq!(report.bucket, ConvergenceState::Healthy);
    assert_eq!(report.kustomization, ConvergenceState::Healthy);
    assert_eq!(
        store.keys("dev-bucket"),
        vec![
            ".gitignore".to_string(),
            "apps/web.yaml".to_string(),
            "kustomization.yaml".to_string(),
        ]
    );
    assert_eq!(
        cluster.calls(),
        vec![
            "annotate Bucket flux-system/dev-bucket",
            "annotate Kustomization flux-system/dev-ks",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_sync_failure_skips_reconciliation() {
    let harness = TestHarness::new();
    harness.write_text("a.yaml", "a: 1\n");

    let store = Arc::new(FlakyStore::new());
    store.fail_make_bucket();
    let cluster = healthy_cluster();
    let session = DevSession::new(harness.config(Duration::from_secs(60)), store, cluster.clone());

    let err = session.run_cycle().await.unwrap_err();

    assert!(matches!(err, DevSyncError::Sync(_)));
    assert!(cluster.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unhealthy_kustomization_surfaces_diagnostics() {
    let harness = TestHarness::new();
    harness.write_text("deploy.yaml", "kind: Deployment\n");

    let cluster = Arc::new(FakeCluster::new());
    cluster.insert(
        ObjectRef::bucket_source(NS, "dev-bucket"),
        FakeObject::converging(READY_CONDITION, TICK, TICK),
    );
    cluster.insert(
        ObjectRef::kustomization(NS, "dev-ks"),
        FakeObject::converging(HEALTHY_CONDITION, TICK, TICK)
            .never_healthy()
            .with_inventory(&[("default_web_apps_Deployment", "v1")]),
    );
    cluster.add_dependent(dependent(
        "apps",
        "v1",
        "Deployment",
        "default",
        "web",
        &[("Available", "False", "Back-off pulling image \"web:dev\"")],
    ));

    let session = DevSession::new(
        harness.config(Duration::from_secs(6)),
        Arc::new(MemoryObjectStore::new()),
        cluster,
    );

    match session.run_cycle().await.unwrap_err() {
        DevSyncError::Reconcile(err @ ReconcileError::Unhealthy { .. }) => {
            assert_eq!(err.messages().len(), 1);
            assert_eq!(err.messages()[0].name, "web");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_session_cleanup() {
    let harness = TestHarness::new();
    let cluster = healthy_cluster();
    let session = DevSession::new(
        harness.config(Duration::from_secs(60)),
        Arc::new(MemoryObjectStore::new()),
        cluster.clone(),
    );

    let report = session.cleanup().await;

    assert!(report.is_clean());
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.missing.len(), 1);
    assert!(!cluster.contains(&ObjectRef::kustomization(NS, "dev-ks")));
}
