//! Action executor
//!
//! Execution is split in three steps so the controller can release the
//! per-cluster lock while the control plane works:
//!
//! 1. [`ActionExecutor::prepare`] resolves the concrete step and commits the
//!    phase transition on the record (READY -> SCALING for scaling work).
//! 2. [`ActionExecutor::perform`] talks to the control plane, the alert
//!    channel and, for replacement clusters, the store.
//! 3. [`ActionExecutor::complete`] folds the outcome back into the record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::alert::{AlertChannel, AlertNotification};
use crate::clock::Clock;
use crate::control_plane::ControlPlane;
use crate::decision::LATENCY_OPTIMIZATIONS;
use crate::error::RemediationResult;
use crate::lifecycle::PhaseEvent;
use crate::models::{
    ActionType, AlertLevel, ClusterRecord, LastAction, Phase, RemediationAction,
    MAX_REPLICA_NODES,
};
use crate::store::ClusterStore;

/// Concrete work resolved from an action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Scale { target: u32, emergency: bool },
    Create { replica: Box<ClusterRecord> },
    Optimize { optimizations: Vec<String> },
    Alert { level: AlertLevel },
    Noop { message: String },
}

/// Action bound to its cluster and resolved step, ready to perform
#[derive(Debug, Clone)]
pub struct PreparedAction {
    pub namespace: String,
    pub cluster: String,
    pub action: RemediationAction,
    pub step: Step,
}

/// Result of talking to the collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl ExecutionOutcome {
    fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Applies remediation actions to cluster records and the control plane
pub struct ActionExecutor {
    store: Arc<dyn ClusterStore>,
    control_plane: Arc<dyn ControlPlane>,
    alerts: Arc<dyn AlertChannel>,
    clock: Arc<dyn Clock>,
}

impl ActionExecutor {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        control_plane: Arc<dyn ControlPlane>,
        alerts: Arc<dyn AlertChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            control_plane,
            alerts,
            clock,
        }
    }

    /// Resolve the step and commit the phase transition on `record`
    pub fn prepare(
        &self,
        record: &mut ClusterRecord,
        action: &RemediationAction,
    ) -> RemediationResult<PreparedAction> {
        let now = self.clock.now();
        let current = record.spec.node_count;

        let step = match action.action_type {
            ActionType::ScaleOut | ActionType::ScaleIn => {
                let requested = action.target_nodes.unwrap_or(match action.action_type {
                    ActionType::ScaleIn => current.saturating_sub(1),
                    _ => current + 1,
                });
                let target = record.spec.clamp_nodes(requested);
                if target == current {
                    Step::Noop {
                        message: format!("cluster already at {} nodes", current),
                    }
                } else {
                    record.transition(PhaseEvent::ScaleRequested, now)?;
                    Step::Scale {
                        target,
                        emergency: false,
                    }
                }
            }
            ActionType::EmergencyScale => {
                let target = action
                    .target_nodes
                    .unwrap_or_else(|| current.saturating_mul(2))
                    .min(record.max_nodes());
                record.transition(PhaseEvent::ScaleRequested, now)?;
                Step::Scale {
                    target,
                    emergency: true,
                }
            }
            ActionType::CreateNewCluster => Step::Create {
                replica: Box::new(build_replica(record, now)?),
            },
            ActionType::OptimizeCluster => {
                let optimizations = if action.optimizations.is_empty() {
                    LATENCY_OPTIMIZATIONS.iter().map(|o| o.to_string()).collect()
                } else {
                    action.optimizations.clone()
                };
                Step::Optimize { optimizations }
            }
            ActionType::Alert => Step::Alert {
                level: action.alert_level.unwrap_or(AlertLevel::Warning),
            },
            ActionType::AlertCritical => Step::Alert {
                level: action.alert_level.unwrap_or(AlertLevel::Critical),
            },
            ActionType::NoAction => Step::Noop {
                message: "no action".to_string(),
            },
        };

        debug!(
            cluster = %record.name(),
            rule = %action.rule_name,
            phase = %record.status.phase,
            step = ?step,
            "Action prepared"
        );

        Ok(PreparedAction {
            namespace: record.namespace().to_string(),
            cluster: record.name().to_string(),
            action: action.clone(),
            step,
        })
    }

    /// Call the collaborators; never holds the cluster lock
    pub async fn perform(&self, prepared: &PreparedAction) -> ExecutionOutcome {
        let cluster = prepared.cluster.as_str();
        match &prepared.step {
            Step::Noop { message } => ExecutionOutcome::succeeded(message.clone()),

            Step::Scale { target, emergency } => {
                match self.control_plane.scale(cluster, *target).await {
                    Ok(true) => {
                        if *emergency {
                            self.alert(
                                cluster,
                                format!("EMERGENCY: Scaled cluster {} to {} nodes", cluster, target),
                                AlertLevel::Critical,
                            )
                            .await;
                        }
                        ExecutionOutcome::succeeded(format!("scaled to {} nodes", target))
                    }
                    Ok(false) => ExecutionOutcome::failed(format!(
                        "control plane rejected scaling {} to {} nodes",
                        cluster, target
                    )),
                    Err(e) => ExecutionOutcome::failed(format!("scale failed: {}", e)),
                }
            }

            Step::Create { replica } => self.create_replica(prepared, replica).await,

            Step::Optimize { optimizations } => {
                match self.control_plane.optimize(cluster, optimizations).await {
                    Ok(true) => ExecutionOutcome::succeeded(format!(
                        "applied optimizations: {}",
                        optimizations.join(", ")
                    )),
                    Ok(false) => ExecutionOutcome::failed("control plane rejected optimizations"),
                    Err(e) => ExecutionOutcome::failed(format!("optimize failed: {}", e)),
                }
            }

            Step::Alert { level } => {
                self.alert(
                    cluster,
                    format!("Search cluster alert: {} - {}", cluster, prepared.action.reason),
                    *level,
                )
                .await;
                ExecutionOutcome::succeeded(format!("{} alert sent", level))
            }
        }
    }

    async fn create_replica(
        &self,
        prepared: &PreparedAction,
        replica: &ClusterRecord,
    ) -> ExecutionOutcome {
        if let Err(e) = self.store.create_or_update(replica).await {
            return ExecutionOutcome::failed(format!(
                "failed to persist replacement cluster {}: {}",
                replica.name(),
                e
            ));
        }

        let created = self.control_plane.create(&replica.spec).await;
        match created {
            Ok(true) => {
                self.alert(
                    &prepared.cluster,
                    format!(
                        "Created new OpenSearch cluster: {} due to {}",
                        replica.name(),
                        prepared.action.reason
                    ),
                    AlertLevel::Warning,
                )
                .await;
                ExecutionOutcome::succeeded(format!("created replacement cluster {}", replica.name()))
            }
            other => {
                let reason = match other {
                    Err(e) => e.to_string(),
                    _ => "control plane rejected create".to_string(),
                };
                let mut failed = replica.clone();
                if failed
                    .transition(PhaseEvent::ProvisionFailed, self.clock.now())
                    .is_ok()
                {
                    if let Err(e) = self
                        .store
                        .update_status(failed.namespace(), failed.name(), &failed.status)
                        .await
                    {
                        warn!(cluster = %failed.name(), error = %e, "Failed to mark replacement cluster as errored");
                    }
                }
                ExecutionOutcome::failed(format!(
                    "failed to create replacement cluster {}: {}",
                    replica.name(),
                    reason
                ))
            }
        }
    }

    async fn alert(&self, cluster: &str, message: String, level: AlertLevel) {
        self.alerts
            .send(AlertNotification::new(cluster, message, level, self.clock.now()))
            .await;
    }

    /// Fold the outcome into `record` and return the executed action
    pub fn complete(
        &self,
        record: &mut ClusterRecord,
        prepared: &PreparedAction,
        outcome: &ExecutionOutcome,
    ) -> RemediationAction {
        let now = self.clock.now();
        let action = self.settle(prepared, outcome);

        if let Step::Scale { target, .. } = prepared.step {
            if record.status.phase == Phase::Scaling {
                let event = if outcome.success {
                    record.spec.node_count = target;
                    record.status.node_count = target;
                    PhaseEvent::ScaleSucceeded
                } else {
                    PhaseEvent::ScaleFailed
                };
                if let Err(e) = record.transition(event, now) {
                    warn!(cluster = %record.name(), error = %e, "Scale outcome not applied");
                }
            } else {
                warn!(
                    cluster = %record.name(),
                    phase = %record.status.phase,
                    "Cluster left SCALING while the scale was running"
                );
            }
        }

        record.status.last_action = Some(LastAction {
            action_type: action.action_type,
            rule_name: action.rule_name.clone(),
            reason: action.reason.clone(),
            timestamp: now,
            success: outcome.success,
            message: outcome.message.clone(),
        });
        record.status.last_updated = now;
        action
    }

    /// The executed action with its outcome, without touching any record
    pub fn settle(&self, prepared: &PreparedAction, outcome: &ExecutionOutcome) -> RemediationAction {
        let now = self.clock.now();
        let mut action = prepared.action.clone();
        if let Step::Scale { target, .. } = prepared.step {
            action.target_nodes = Some(target);
        }
        if outcome.success {
            action.mark_succeeded(now);
        } else {
            action.mark_failed(now, outcome.message.clone().unwrap_or_default());
        }
        action
    }

    /// Prepare, perform and complete in one go, without any locking
    pub async fn execute(
        &self,
        record: &mut ClusterRecord,
        action: &RemediationAction,
    ) -> RemediationResult<RemediationAction> {
        let prepared = self.prepare(record, action)?;
        let outcome = self.perform(&prepared).await;
        Ok(self.complete(record, &prepared, &outcome))
    }
}

/// Replacement cluster derived from `origin`, in phase CREATING
fn build_replica(origin: &ClusterRecord, now: DateTime<Utc>) -> RemediationResult<ClusterRecord> {
    let name = format!("{}-replica-{}", origin.name(), now.timestamp_millis());
    let nodes = origin.spec.node_count.min(MAX_REPLICA_NODES).max(1);

    let mut spec = origin.spec.clone();
    spec.cluster_name = name.clone();
    spec.node_count = nodes;
    spec.auto_scaling.min_nodes = spec.auto_scaling.min_nodes.min(nodes).max(1);
    spec.auto_scaling.max_nodes = spec.auto_scaling.max_nodes.max(nodes);
    spec.validate()?;

    let mut replica = ClusterRecord::new(&name, origin.namespace(), spec, Phase::Pending, now);
    replica.transition(PhaseEvent::ProvisionStarted, now)?;
    Ok(replica)
}

#[cfg(test)]
mod tests;
