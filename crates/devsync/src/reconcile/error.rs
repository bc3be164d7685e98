//! Reconciliation error types.

use std::time::Duration;
use thiserror::Error;

use super::types::{DiagnosticMessage, GroupVersionKind, ObjectRef};

/// Errors from the cluster API seam.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Cluster API request failed: {0}")]
    Request(String),

    #[error("Cluster API returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Failed to decode cluster API response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Request(err.to_string())
        }
    }
}

/// The wait phase a timeout or poll error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Applied,
    Healthy,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Applied => f.write_str("reconcile request to be handled"),
            Phase::Healthy => f.write_str("health check"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to request reconciliation of {object}: {source}")]
    Request {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    #[error("Failed to read {object} while waiting for {phase}: {source}")]
    Poll {
        object: ObjectRef,
        phase: Phase,
        #[source]
        source: ClientError,
    },

    #[error("Timed out after {after:?} waiting for {phase} of {object}")]
    Timeout {
        object: ObjectRef,
        phase: Phase,
        after: Duration,
    },

    #[error("{object} is not healthy:\n{}", format_messages(.messages))]
    Unhealthy {
        object: ObjectRef,
        messages: Vec<DiagnosticMessage>,
    },

    #[error("Cannot diagnose {object}: failed to re-read its status: {source}")]
    DiagnosticRead {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    #[error("Cannot diagnose {0}: inventory is missing")]
    MissingInventory(ObjectRef),

    #[error("Invalid inventory item '{id}': {reason}")]
    InvalidInventoryEntry { id: String, reason: String },

    #[error("Failed to list {gvk} objects owned by {owner}: {source}")]
    ListDependents {
        gvk: GroupVersionKind,
        owner: ObjectRef,
        #[source]
        source: ClientError,
    },
}

impl ReconcileError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ReconcileError::Timeout { .. })
    }

    /// Failure while explaining a failure, as opposed to the failure itself.
    pub fn is_diagnostic_failure(&self) -> bool {
        matches!(
            self,
            ReconcileError::DiagnosticRead { .. }
                | ReconcileError::MissingInventory(_)
                | ReconcileError::InvalidInventoryEntry { .. }
                | ReconcileError::ListDependents { .. }
        )
    }

    /// Diagnostics attached to an unhealthy result, if any.
    pub fn messages(&self) -> &[DiagnosticMessage] {
        match self {
            ReconcileError::Unhealthy { messages, .. } => messages,
            _ => &[],
        }
    }
}

fn format_messages(messages: &[DiagnosticMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("  {}", m))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
