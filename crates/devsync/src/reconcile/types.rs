//! Typed views over the reconciler's objects.
//!
//! Remote payloads are decoded once into these narrow shapes; nothing
//! downstream navigates untyped JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const SOURCE_GROUP: &str = "source.toolkit.fluxcd.io";
pub const KUSTOMIZE_GROUP: &str = "kustomize.toolkit.fluxcd.io";
pub const FLUX_API_VERSION: &str = "v1beta2";

pub const READY_CONDITION: &str = "Ready";
pub const HEALTHY_CONDITION: &str = "Healthy";

/// Inventory ids encode `:` in names as a double underscore.
const COLON_TRANSCODED: &str = "__";
const FIELD_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// `group/version`, or just `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Splits an `apiVersion` string into group and version.
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        match api_version.rsplit_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Handle to one remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub gvk: GroupVersionKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(gvk: GroupVersionKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gvk,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn secret(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(GroupVersionKind::new("", "v1", "Secret"), namespace, name)
    }

    pub fn bucket_source(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            GroupVersionKind::new(SOURCE_GROUP, FLUX_API_VERSION, "Bucket"),
            namespace,
            name,
        )
    }

    pub fn kustomization(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            GroupVersionKind::new(KUSTOMIZE_GROUP, FLUX_API_VERSION, "Kustomization"),
            namespace,
            name,
        )
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.gvk.kind, self.namespace, self.name)
    }
}

/// A reconcilable object plus how to judge its health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTarget {
    pub object: ObjectRef,
    /// Condition type that must report `True` once applied.
    pub health_condition: String,
    /// Whether the object records an inventory usable for diagnostics.
    pub records_inventory: bool,
}

impl ReconcileTarget {
    /// A bucket source; healthy once `Ready` is true.
    pub fn bucket_source(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            object: ObjectRef::bucket_source(namespace, name),
            health_condition: READY_CONDITION.to_string(),
            records_inventory: false,
        }
    }

    /// A kustomization; healthy once `Healthy` is true.
    pub fn kustomization(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            object: ObjectRef::kustomization(namespace, name),
            health_condition: HEALTHY_CONDITION.to_string(),
            records_inventory: true,
        }
    }
}

impl fmt::Display for ReconcileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.object.fmt(f)
    }
}

/// "Please reconcile now", as written to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub object: ObjectRef,
    pub requested_at: String,
}

/// Progress of one target. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceState {
    Requested,
    Applied,
    Healthy,
    Failed,
}

impl ConvergenceState {
    /// Returns the new state if `next` is a legal transition.
    pub fn advance(self, next: ConvergenceState) -> Option<ConvergenceState> {
        use ConvergenceState::*;
        match (self, next) {
            (Requested, Applied) | (Applied, Healthy) | (Applied, Failed) => Some(next),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConvergenceState::Healthy | ConvergenceState::Failed)
    }
}

impl fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConvergenceState::Requested => "requested",
            ConvergenceState::Applied => "applied",
            ConvergenceState::Healthy => "healthy",
            ConvergenceState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

/// Raw inventory record: `id` is `<namespace>_<name>_<group>_<kind>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: String,
    #[serde(rename = "v")]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub entries: Vec<InventoryRecord>,
}

/// One owned object named by an inventory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl InventoryEntry {
    /// Parses an inventory id. Errors carry a human-readable reason.
    pub fn parse(id: &str, version: &str) -> Result<Self, String> {
        if id.matches(FIELD_SEPARATOR).count() < 3 {
            return Err("too few fields".to_string());
        }

        let (namespace, rest) = id
            .split_once(FIELD_SEPARATOR)
            .ok_or_else(|| "missing namespace".to_string())?;
        let (rest, kind) = rest
            .rsplit_once(FIELD_SEPARATOR)
            .ok_or_else(|| "missing kind".to_string())?;
        let (name, group) = rest
            .rsplit_once(FIELD_SEPARATOR)
            .ok_or_else(|| "missing group".to_string())?;

        let name = name.replace(COLON_TRANSCODED, ":");
        if name.contains(FIELD_SEPARATOR) {
            return Err("too many fields".to_string());
        }
        if name.is_empty() {
            return Err("empty name".to_string());
        }
        if kind.is_empty() {
            return Err("empty kind".to_string());
        }

        Ok(Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name,
        })
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }
}

/// Status of a reconcilable object as far as the driver cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilableObject {
    pub last_handled_reconcile_at: Option<String>,
    pub conditions: Vec<Condition>,
    pub inventory: Option<Inventory>,
}

impl ReconcilableObject {
    /// True if the condition exists and its status is `True`.
    pub fn condition_is_true(&self, type_: &str) -> bool {
        self.conditions
            .iter()
            .any(|c| c.type_ == type_ && c.is_true())
    }

    pub fn has_handled(&self, requested_at: &str) -> bool {
        self.last_handled_reconcile_at.as_deref() == Some(requested_at)
    }
}

/// Any listed object: identity plus status conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceView {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub conditions: Vec<Condition>,
}

/// A dependent object's complaint, e.g. `Deployment default/web: ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticMessage {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub message: String,
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}: {}",
            self.kind, self.namespace, self.name, self.message
        )
    }
}

/// Wire shape of any object returned by the API server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDocument {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: DocumentMeta,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatus {
    #[serde(default)]
    pub last_handled_reconcile_at: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub inventory: Option<Inventory>,
}

/// Wire shape of a list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectListDocument {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<ObjectDocument>,
}

impl ObjectDocument {
    pub fn into_reconcilable(self) -> ReconcilableObject {
        let status = self.status.unwrap_or_default();
        ReconcilableObject {
            last_handled_reconcile_at: status.last_handled_reconcile_at,
            conditions: status.conditions,
            inventory: status.inventory,
        }
    }

    /// `fallback` fills in apiVersion/kind, which list items may omit.
    pub fn into_view(self, fallback: &GroupVersionKind) -> ResourceView {
        let gvk = if self.api_version.is_empty() || self.kind.is_empty() {
            fallback.clone()
        } else {
            GroupVersionKind::from_api_version(&self.api_version, self.kind)
        };
        ResourceView {
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
            namespace: self.metadata.namespace,
            name: self.metadata.name,
            conditions: self.status.map(|s| s.conditions).unwrap_or_default(),
        }
    }
}
