//! Request → applied → healthy, one target at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::client::{ClusterClient, REQUESTED_AT_ANNOTATION};
use super::diagnostics::collect_diagnostics;
use super::error::{ClientError, Phase, ReconcileError, Result};
use super::types::{ConvergenceState, ObjectRef, ReconcileRequest, ReconcileTarget};
use super::wait::{poll_until, WaitError};

/// Poll cadence and per-phase deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            timeout: Duration::from_secs(300),
        }
    }
}

pub struct ReconciliationDriver {
    client: Arc<dyn ClusterClient>,
    settings: DriverSettings,
}

impl ReconciliationDriver {
    pub fn new(client: Arc<dyn ClusterClient>, settings: DriverSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> DriverSettings {
        self.settings
    }

    /// Drives one target to `Healthy`.
    ///
    /// A health timeout on an inventory-bearing target triggers diagnostic
    /// collection: collected messages come back as
    /// [`ReconcileError::Unhealthy`], no messages as the plain timeout, and
    /// a failed collection as its own error.
    pub async fn reconcile(&self, target: &ReconcileTarget) -> Result<ConvergenceState> {
        let span = info_span!(
            "reconcile",
            kind = %target.object.gvk.kind,
            namespace = %target.object.namespace,
            name = %target.object.name,
        );

        self.drive(target).instrument(span).await
    }

    async fn drive(&self, target: &ReconcileTarget) -> Result<ConvergenceState> {
        let mut state = ConvergenceState::Requested;
        let request = self.request(&target.object).await?;

        self.wait_applied(&request).await?;
        state = transition(state, ConvergenceState::Applied);

        match self.wait_healthy(target).await {
            Ok(()) => {
                state = transition(state, ConvergenceState::Healthy);
                info!("{} is healthy", target);
                Ok(state)
            }
            Err(err) if err.is_timeout() => {
                state = transition(state, ConvergenceState::Failed);
                warn!("{} did not become healthy ({})", target, state);
                Err(self.diagnose(target, err).await)
            }
            Err(err) => Err(err),
        }
    }

    /// Reconciles targets strictly in order, stopping at the first failure.
    pub async fn reconcile_all(&self, targets: &[ReconcileTarget]) -> Result<Vec<ConvergenceState>> {
        let mut states = Vec::with_capacity(targets.len());
        for target in targets {
            states.push(self.reconcile(target).await?);
        }
        Ok(states)
    }

    /// Writes the request annotation with the current time.
    pub async fn request(&self, object: &ObjectRef) -> Result<ReconcileRequest> {
        let requested_at = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

        self.client
            .annotate(object, REQUESTED_AT_ANNOTATION, &requested_at)
            .await
            .map_err(|source| ReconcileError::Request {
                object: object.clone(),
                source,
            })?;

        debug!(requested_at = %requested_at, "Requested reconciliation of {}", object);
        Ok(ReconcileRequest {
            object: object.clone(),
            requested_at,
        })
    }

    /// Waits until the object reports having handled `request`.
    pub async fn wait_applied(&self, request: &ReconcileRequest) -> Result<()> {
        let client = &self.client;
        let object = &request.object;

        poll_until(self.settings.interval, self.settings.timeout, || async move {
            let status = client.get_reconcilable(object).await?;
            Ok::<_, ClientError>(status.has_handled(&request.requested_at))
        })
        .await
        .map_err(|e| self.wait_error(object, Phase::Applied, e))
    }

    /// Waits until the target's health condition is `True`.
    pub async fn wait_healthy(&self, target: &ReconcileTarget) -> Result<()> {
        let client = &self.client;
        let object = &target.object;
        let condition = target.health_condition.as_str();

        poll_until(self.settings.interval, self.settings.timeout, || async move {
            let status = client.get_reconcilable(object).await?;
            Ok::<_, ClientError>(status.condition_is_true(condition))
        })
        .await
        .map_err(|e| self.wait_error(object, Phase::Healthy, e))
    }

    async fn diagnose(&self, target: &ReconcileTarget, timeout: ReconcileError) -> ReconcileError {
        if !target.records_inventory {
            return timeout;
        }

        let status = match self.client.get_reconcilable(&target.object).await {
            Ok(status) => status,
            Err(source) => {
                error!("Couldn't re-read {} for diagnostics: {}", target, source);
                return ReconcileError::DiagnosticRead {
                    object: target.object.clone(),
                    source,
                };
            }
        };

        match collect_diagnostics(self.client.as_ref(), &target.object, &status).await {
            Ok(messages) if messages.is_empty() => timeout,
            Ok(messages) => {
                for message in &messages {
                    error!("{}", message);
                }
                ReconcileError::Unhealthy {
                    object: target.object.clone(),
                    messages,
                }
            }
            Err(err) => {
                error!("Couldn't collect diagnostics for {}: {}", target, err);
                err
            }
        }
    }

    fn wait_error(
        &self,
        object: &ObjectRef,
        phase: Phase,
        err: WaitError<ClientError>,
    ) -> ReconcileError {
        match err {
            WaitError::Timeout(after) => ReconcileError::Timeout {
                object: object.clone(),
                phase,
                after,
            },
            WaitError::Check(source) => ReconcileError::Poll {
                object: object.clone(),
                phase,
                source,
            },
        }
    }
}

fn transition(from: ConvergenceState, to: ConvergenceState) -> ConvergenceState {
    match from.advance(to) {
        Some(next) => {
            debug!("{} -> {}", from, next);
            next
        }
        None => {
            warn!("Ignoring illegal transition {} -> {}", from, to);
            from
        }
    }
}
