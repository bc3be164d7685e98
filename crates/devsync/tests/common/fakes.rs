//! Scripted stand-ins for the cluster API and the object store.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use devsync::bucket::{MemoryObjectStore, ObjectStore, StoreError};
use devsync::reconcile::{
    ClientError, ClusterClient, Condition, GroupVersionKind, Inventory, InventoryRecord, ObjectRef,
    ReconcilableObject, ResourceView, REQUESTED_AT_ANNOTATION,
};

/// A reconciler object whose status evolves with (virtual) time since the
/// last reconcile request.
#[derive(Debug, Clone)]
pub struct FakeObject {
    /// Delay until the request is echoed back; `None` never echoes.
    pub applied_after: Option<Duration>,
    /// Delay until the health condition turns true; `None` never does.
    pub healthy_after: Option<Duration>,
    pub health_condition: String,
    pub unhealthy_message: String,
    pub inventory: Option<Inventory>,
    requested: Option<(String, Instant)>,
}

impl FakeObject {
    pub fn converging(health_condition: &str, applied_after: Duration, healthy_after: Duration) -> Self {
        Self {
            applied_after: Some(applied_after),
            healthy_after: Some(healthy_after),
            health_condition: health_condition.to_string(),
            unhealthy_message: "reconciliation in progress".to_string(),
            inventory: None,
            requested: None,
        }
    }

    pub fn never_applied(mut self) -> Self {
        self.applied_after = None;
        self
    }

    pub fn never_healthy(mut self) -> Self {
        self.healthy_after = None;
        self
    }

    pub fn with_inventory(mut self, ids: &[(&str, &str)]) -> Self {
        self.inventory = Some(Inventory {
            entries: ids
                .iter()
                .map(|(id, v)| InventoryRecord {
                    id: id.to_string(),
                    version: v.to_string(),
                })
                .collect(),
        });
        self
    }

    fn status(&self) -> ReconcilableObject {
        let elapsed = self.requested.as_ref().map(|(_, at)| at.elapsed());
        let reached = |delay: Option<Duration>| match (elapsed, delay) {
            (Some(elapsed), Some(delay)) => elapsed >= delay,
            _ => false,
        };

        let last_handled_reconcile_at = match &self.requested {
            Some((value, _)) if reached(self.applied_after) => Some(value.clone()),
            _ => None,
        };

        let healthy = reached(self.healthy_after);
        ReconcilableObject {
            last_handled_reconcile_at,
            conditions: vec![Condition {
                type_: self.health_condition.clone(),
                status: if healthy { "True" } else { "False" }.to_string(),
                reason: None,
                message: if healthy {
                    String::new()
                } else {
                    self.unhealthy_message.clone()
                },
            }],
            inventory: self.inventory.clone(),
        }
    }
}

/// In-memory cluster with call recording.
#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<HashMap<ObjectRef, FakeObject>>,
    dependents: Mutex<HashMap<GroupVersionKind, Vec<ResourceView>>>,
    failing_lists: Mutex<HashSet<GroupVersionKind>>,
    failing_deletes: Mutex<HashSet<ObjectRef>>,
    reads: Mutex<usize>,
    read_limit: Mutex<Option<usize>>,
    calls: Mutex<Vec<String>>,
    selectors: Mutex<Vec<BTreeMap<String, String>>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, object: ObjectRef, fake: FakeObject) {
        self.objects.lock().unwrap().insert(object, fake);
    }

    pub fn add_dependent(&self, view: ResourceView) {
        let gvk = GroupVersionKind::new(&view.group, &view.version, &view.kind);
        self.dependents.lock().unwrap().entry(gvk).or_default().push(view);
    }

    pub fn fail_list(&self, gvk: GroupVersionKind) {
        self.failing_lists.lock().unwrap().insert(gvk);
    }

    pub fn fail_delete(&self, object: ObjectRef) {
        self.failing_deletes.lock().unwrap().insert(object);
    }

    /// Status reads beyond the first `limit` fail.
    pub fn fail_reads_after(&self, limit: usize) {
        *self.read_limit.lock().unwrap() = Some(limit);
    }

    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.objects.lock().unwrap().contains_key(object)
    }

    /// `"<verb> <target>"` for every mutating or listing call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn selectors(&self) -> Vec<BTreeMap<String, String>> {
        self.selectors.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// A dependent object with a single condition.
pub fn dependent(
    group: &str,
    version: &str,
    kind: &str,
    namespace: &str,
    name: &str,
    conditions: &[(&str, &str, &str)],
) -> ResourceView {
    ResourceView {
        group: group.to_string(),
        version: version.to_string(),
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        conditions: conditions
            .iter()
            .map(|(type_, status, message)| Condition {
                type_: type_.to_string(),
                status: status.to_string(),
                reason: None,
                message: message.to_string(),
            })
            .collect(),
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_reconcilable(&self, object: &ObjectRef) -> Result<ReconcilableObject, ClientError> {
        let mut reads = self.reads.lock().unwrap();
        *reads += 1;
        if matches!(*self.read_limit.lock().unwrap(), Some(limit) if *reads > limit) {
            return Err(ClientError::Status {
                code: 503,
                message: "apiserver unavailable".to_string(),
            });
        }
        drop(reads);

        self.objects
            .lock()
            .unwrap()
            .get(object)
            .map(FakeObject::status)
            .ok_or_else(|| ClientError::NotFound(object.to_string()))
    }

    async fn annotate(&self, object: &ObjectRef, key: &str, value: &str) -> Result<(), ClientError> {
        self.record(format!("annotate {}", object));
        let mut objects = self.objects.lock().unwrap();
        let fake = objects
            .get_mut(object)
            .ok_or_else(|| ClientError::NotFound(object.to_string()))?;
        if key == REQUESTED_AT_ANNOTATION {
            fake.requested = Some((value.to_string(), Instant::now()));
        }
        Ok(())
    }

    async fn list_labelled(
        &self,
        gvk: &GroupVersionKind,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ResourceView>, ClientError> {
        self.record(format!("list {}", gvk));
        self.selectors.lock().unwrap().push(labels.clone());

        if self.failing_lists.lock().unwrap().contains(gvk) {
            return Err(ClientError::Status {
                code: 403,
                message: "forbidden".to_string(),
            });
        }
        Ok(self
            .dependents
            .lock()
            .unwrap()
            .get(gvk)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, object: &ObjectRef) -> Result<(), ClientError> {
        self.record(format!("delete {}", object));
        if self.failing_deletes.lock().unwrap().contains(object) {
            return Err(ClientError::Status {
                code: 500,
                message: "internal error".to_string(),
            });
        }
        match self.objects.lock().unwrap().remove(object) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(object.to_string())),
        }
    }
}

/// Memory store whose uploads fail for chosen keys.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryObjectStore,
    failing_keys: Mutex<HashSet<String>>,
    fail_make_bucket: Mutex<bool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upload(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_make_bucket(&self) {
        *self.fail_make_bucket.lock().unwrap() = true;
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn remove_bucket_force(&self, bucket: &str) -> Result<(), StoreError> {
        self.inner.remove_bucket_force(bucket).await
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        if *self.fail_make_bucket.lock().unwrap() {
            return Err(StoreError::Request("connection refused".to_string()));
        }
        self.inner.make_bucket(bucket).await
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StoreError> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(StoreError::Request(format!("upload of {} reset", key)));
        }
        self.inner.put_file(bucket, key, path).await
    }
}
