//! Explaining why a reconciled object never became healthy.

use std::collections::HashSet;

use super::client::{ownership_labels, ClusterClient};
use super::error::{ReconcileError, Result};
use super::types::{DiagnosticMessage, GroupVersionKind, Inventory, InventoryEntry, ObjectRef, ReconcilableObject};

/// Distinct kinds named by an inventory, in first-seen order.
pub fn inventory_kinds(inventory: &Inventory) -> Result<Vec<GroupVersionKind>> {
    let mut seen = HashSet::new();
    let mut kinds = Vec::new();

    for record in &inventory.entries {
        let entry = InventoryEntry::parse(&record.id, &record.version).map_err(|reason| {
            ReconcileError::InvalidInventoryEntry {
                id: record.id.clone(),
                reason,
            }
        })?;

        let gvk = entry.gvk();
        if seen.insert(gvk.clone()) {
            kinds.push(gvk);
        }
    }

    Ok(kinds)
}

/// Gathers one message per non-true condition of every object owned by
/// `owner`, as recorded in its inventory.
///
/// An empty result is not an error. A missing inventory or a failed list
/// call is.
pub async fn collect_diagnostics(
    client: &dyn ClusterClient,
    owner: &ObjectRef,
    status: &ReconcilableObject,
) -> Result<Vec<DiagnosticMessage>> {
    let inventory = status
        .inventory
        .as_ref()
        .ok_or_else(|| ReconcileError::MissingInventory(owner.clone()))?;

    let labels = ownership_labels(owner);
    let mut messages = Vec::new();

    for gvk in inventory_kinds(inventory)? {
        let objects = client.list_labelled(&gvk, &labels).await.map_err(|source| {
            ReconcileError::ListDependents {
                gvk: gvk.clone(),
                owner: owner.clone(),
                source,
            }
        })?;

        for object in objects {
            for condition in object.conditions.iter().filter(|c| !c.is_true()) {
                messages.push(DiagnosticMessage {
                    kind: object.kind.clone(),
                    namespace: object.namespace.clone(),
                    name: object.name.clone(),
                    message: condition.message.clone(),
                });
            }
        }
    }

    Ok(messages)
}
