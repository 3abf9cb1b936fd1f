//! Remediation controller
//!
//! Entry point of the control loop. One alarm event flows through
//! classifier -> decision policy -> cooldown gate -> executor -> store.
//!
//! Locking: every read-modify-write of a cluster record happens under the
//! cluster's [`ClusterLocks`] guard. The guard is released before the
//! control plane is called; the committed SCALING phase keeps other
//! reconciliations from issuing conflicting scaling work meanwhile.

mod locks;

pub use locks::ClusterLocks;

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::alert::AlertChannel;
use crate::classifier::classify;
use crate::clock::{Clock, SystemClock};
use crate::control_plane::{ControlPlane, ControlPlaneStatus};
use crate::decision::{AlarmRuleEngine, RemediationPolicy};
use crate::error::{RemediationError, RemediationResult, StoreError};
use crate::executor::{ActionExecutor, PreparedAction, Step};
use crate::gate::{BlockReason, CooldownEntry, CooldownGate, CooldownPolicy, GateDisposition};
use crate::health::{Component, HealthRegistry};
use crate::lifecycle::PhaseEvent;
use crate::models::{
    ActionType, AlarmEvent, AutoScaling, ClusterRecord, ClusterRequest, ClusterSpec, Phase,
    RemediationAction, Severity, Thresholds, DEFAULT_NAMESPACE,
};
use crate::observability::{ControllerMetrics, StructuredLogger};
use crate::scheduler::{DeferredAction, RetryScheduler, ScheduleOutcome};
use crate::store::ClusterStore;

/// Added to the remaining cooldown so a deferred entry wakes after expiry
const DEFERRED_GRACE: Duration = Duration::from_millis(10);

/// Instance class for explicitly provisioned clusters
const DEFAULT_INSTANCE_CLASS: &str = "m6g.large.search";

/// Controller settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace for events and requests that do not name one
    pub namespace: String,
    /// Fold the control plane's cluster status into the phase before deciding
    pub phase_sync: bool,
    /// Capacity of the deferred-action channel
    pub deferred_queue_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            phase_sync: true,
            deferred_queue_size: 256,
        }
    }
}

/// What happened to one proposed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    /// Handed to a background task (priority below HIGH)
    Dispatched,
    Deferred,
    /// A deferred entry for the same rule is already pending
    Coalesced,
    Blocked,
    Skipped,
}

/// Per-action entry of a [`ReconcileReport`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub action: RemediationAction,
    #[serde(flatten)]
    pub disposition: Option<GateDisposition>,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionOutcome {
    fn new(
        action: RemediationAction,
        disposition: GateDisposition,
        status: ExecutionStatus,
        message: Option<String>,
    ) -> Self {
        Self {
            action,
            disposition: Some(disposition),
            status,
            message,
        }
    }

    fn skipped(
        action: RemediationAction,
        disposition: Option<GateDisposition>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action,
            disposition,
            status: ExecutionStatus::Skipped,
            message: Some(reason.into()),
        }
    }
}

/// Result of reconciling one alarm event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub cluster: String,
    pub namespace: String,
    pub alarm_name: String,
    pub severity: Severity,
    pub strategy: String,
    /// Phase the decision was made against
    pub phase: Phase,
    pub actions: Vec<ActionOutcome>,
}

impl ReconcileReport {
    pub fn outcome(&self, rule: &str) -> Option<&ActionOutcome> {
        self.actions.iter().find(|o| o.action.rule_name == rule)
    }
}

/// Builder for [`Controller`]
pub struct ControllerBuilder {
    store: Arc<dyn ClusterStore>,
    control_plane: Arc<dyn ControlPlane>,
    alerts: Arc<dyn AlertChannel>,
    policy: Option<Arc<dyn RemediationPolicy>>,
    cooldowns: CooldownPolicy,
    clock: Arc<dyn Clock>,
    health: HealthRegistry,
    logger: StructuredLogger,
    config: ControllerConfig,
}

impl ControllerBuilder {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        control_plane: Arc<dyn ControlPlane>,
        alerts: Arc<dyn AlertChannel>,
    ) -> Self {
        Self {
            store,
            control_plane,
            alerts,
            policy: None,
            cooldowns: CooldownPolicy::default(),
            clock: Arc::new(SystemClock),
            health: HealthRegistry::new(),
            logger: StructuredLogger::default(),
            config: ControllerConfig::default(),
        }
    }

    /// Decision policy; the alarm rule engine when unset
    pub fn policy(mut self, policy: Arc<dyn RemediationPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn cooldowns(mut self, cooldowns: CooldownPolicy) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Controller plus the deferred-action receiver for [`Controller::run_deferred`]
    pub fn build(self) -> (Arc<Controller>, mpsc::Receiver<DeferredAction>) {
        let policy: Arc<dyn RemediationPolicy> = match self.policy {
            Some(policy) => policy,
            None => Arc::new(AlarmRuleEngine::new(self.logger.clone())),
        };
        let (scheduler, deferred_rx) = RetryScheduler::new(self.config.deferred_queue_size);
        let executor = ActionExecutor::new(
            self.store.clone(),
            self.control_plane.clone(),
            self.alerts,
            self.clock.clone(),
        );

        let controller = Controller {
            store: self.store,
            control_plane: self.control_plane,
            policy,
            gate: CooldownGate::new(self.cooldowns, self.clock.clone()),
            executor,
            scheduler,
            locks: ClusterLocks::new(),
            clock: self.clock,
            health: self.health,
            metrics: ControllerMetrics::new(),
            logger: self.logger,
            config: self.config,
        };
        (Arc::new(controller), deferred_rx)
    }
}

/// Remediation control loop
pub struct Controller {
    store: Arc<dyn ClusterStore>,
    control_plane: Arc<dyn ControlPlane>,
    policy: Arc<dyn RemediationPolicy>,
    gate: CooldownGate,
    executor: ActionExecutor,
    scheduler: RetryScheduler,
    locks: ClusterLocks,
    clock: Arc<dyn Clock>,
    health: HealthRegistry,
    metrics: ControllerMetrics,
    logger: StructuredLogger,
    config: ControllerConfig,
}

impl Controller {
    /// Register health components and mark the controller ready
    pub async fn initialize(&self) {
        self.health.mark_initialized().await;
        self.refresh_cluster_count().await;
    }

    pub fn strategy(&self) -> &'static str {
        self.policy.name()
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn gate(&self) -> &CooldownGate {
        &self.gate
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Reconcile one alarm event
    ///
    /// Invalid input and store failures abort the reconciliation; gate
    /// verdicts and execution failures are reported per action.
    pub async fn reconcile(self: &Arc<Self>, event: AlarmEvent) -> RemediationResult<ReconcileReport> {
        let started = Instant::now();
        let cluster = event.cluster_name.clone();
        let result = self.reconcile_event(event).await;
        self.metrics
            .observe_reconcile_latency(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(cluster = %cluster, error = %e, "Reconciliation aborted");
        }
        result
    }

    async fn reconcile_event(self: &Arc<Self>, event: AlarmEvent) -> RemediationResult<ReconcileReport> {
        event.validate()?;
        let severity = classify(&event);
        self.metrics.inc_alarms_received(severity);
        self.logger
            .log_alarm_received(&event.cluster_name, &event.alarm_name, severity);

        let namespace = self.resolve_namespace(event.namespace.as_deref());
        let name = event.cluster_name.trim().to_string();
        let observed = self.observe(&name).await;

        let (phase, plan) = {
            let _guard = self.locks.acquire(&namespace, &name).await;
            let now = self.clock.now();
            let (mut record, is_new) = match self.load(&namespace, &name).await? {
                Some(record) => (record, false),
                None => (ClusterRecord::with_defaults(&name, &namespace, now), true),
            };

            if record.status.phase == Phase::Deleting {
                debug!(cluster = %name, "Cluster is being deleted, alarm ignored");
                return Ok(self.report(&event, &namespace, severity, Phase::Deleting, Vec::new()));
            }

            self.apply_sync(&mut record, observed);
            record.spec.require_thresholds()?;
            let plan = self.policy.plan(&record, &event, severity);

            record.status.last_alarm_info = Some(event.summary());
            if let Some(metrics) = &event.metrics {
                record.status.current_metrics = Some(metrics.clone());
            }
            record.status.last_updated = now;

            if is_new {
                self.persist(&record).await?;
                self.refresh_cluster_count().await;
            } else {
                self.persist_status(&record).await?;
            }
            (record.status.phase, plan)
        };

        let mut outcomes = Vec::with_capacity(plan.len());
        for action in plan {
            self.metrics.inc_actions_decided(&action);
            self.logger.log_action_decided(&name, &action);
            outcomes.push(
                self.process_action(&namespace, &name, action, severity)
                    .await?,
            );
        }

        Ok(self.report(&event, &namespace, severity, phase, outcomes))
    }

    fn report(
        &self,
        event: &AlarmEvent,
        namespace: &str,
        severity: Severity,
        phase: Phase,
        actions: Vec<ActionOutcome>,
    ) -> ReconcileReport {
        ReconcileReport {
            cluster: event.cluster_name.trim().to_string(),
            namespace: namespace.to_string(),
            alarm_name: event.alarm_name.clone(),
            severity,
            strategy: self.strategy().to_string(),
            phase,
            actions,
        }
    }

    /// Gate one action and execute, defer or block it
    async fn process_action(
        self: &Arc<Self>,
        namespace: &str,
        name: &str,
        action: RemediationAction,
        severity: Severity,
    ) -> RemediationResult<ActionOutcome> {
        let guard = self.locks.acquire(namespace, name).await;
        let Some(record) = self.load(namespace, name).await? else {
            return Ok(ActionOutcome::skipped(action, None, "cluster no longer exists"));
        };

        let disposition = self.evaluate(&record, &action, severity);
        match disposition {
            GateDisposition::Block { reason, phase } => {
                let message = match reason {
                    BlockReason::StateConflict => format!("cluster is {}", phase),
                    BlockReason::InFlight => "same rule already executing".to_string(),
                };
                Ok(ActionOutcome::new(
                    action,
                    disposition,
                    ExecutionStatus::Blocked,
                    Some(message),
                ))
            }
            GateDisposition::Defer { .. } => {
                let remaining = disposition.remaining().unwrap_or_default();
                Ok(self.defer(namespace, name, action, severity, disposition, remaining))
            }
            GateDisposition::Execute | GateDisposition::Bypass => {
                let synchronous = action.priority.is_synchronous();
                self.run_permitted(guard, record, action, disposition, synchronous)
                    .await
            }
        }
    }

    fn evaluate(
        &self,
        record: &ClusterRecord,
        action: &RemediationAction,
        severity: Severity,
    ) -> GateDisposition {
        let disposition = self
            .gate
            .evaluate(record.name(), action, record.status.phase, severity);
        self.metrics.inc_gate_disposition(&disposition);
        self.logger
            .log_gate_disposition(record.name(), action, severity, &disposition);
        disposition
    }

    /// Commit the phase transition, release the lock, then perform
    async fn run_permitted(
        self: &Arc<Self>,
        guard: OwnedMutexGuard<()>,
        mut record: ClusterRecord,
        action: RemediationAction,
        disposition: GateDisposition,
        synchronous: bool,
    ) -> RemediationResult<ActionOutcome> {
        let prepared = match self.begin(&mut record, &action).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.gate.complete(record.name(), &action.rule_name, false);
                return Err(e);
            }
        };
        drop(guard);

        if synchronous {
            let executed = self.finish(prepared).await;
            let status = if executed.success {
                ExecutionStatus::Succeeded
            } else {
                ExecutionStatus::Failed
            };
            let message = executed.error_message.clone();
            Ok(ActionOutcome::new(executed, disposition, status, message))
        } else {
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                controller.finish(prepared).await;
            });
            Ok(ActionOutcome::new(
                action,
                disposition,
                ExecutionStatus::Dispatched,
                None,
            ))
        }
    }

    async fn begin(
        &self,
        record: &mut ClusterRecord,
        action: &RemediationAction,
    ) -> RemediationResult<PreparedAction> {
        let prepared = self.executor.prepare(record, action)?;
        if matches!(prepared.step, Step::Scale { .. }) {
            self.persist_status(record).await?;
        }
        Ok(prepared)
    }

    /// Perform, then fold the outcome back under the lock
    async fn finish(&self, prepared: PreparedAction) -> RemediationAction {
        let outcome = self.executor.perform(&prepared).await;
        let namespace = prepared.namespace.as_str();
        let name = prepared.cluster.as_str();

        let executed = {
            let _guard = self.locks.acquire(namespace, name).await;
            let executed = match self.load(namespace, name).await {
                Ok(Some(mut record)) => {
                    let executed = self.executor.complete(&mut record, &prepared, &outcome);
                    // a successful scale also moves spec.nodeCount
                    let scaled = matches!(prepared.step, Step::Scale { .. });
                    let written = if executed.success && scaled {
                        self.persist(&record).await.map(|_| ())
                    } else {
                        self.persist_status(&record).await
                    };
                    if let Err(e) = written {
                        warn!(cluster = %name, error = %e, "Failed to persist action outcome");
                    }
                    executed
                }
                Ok(None) => {
                    warn!(cluster = %name, "Cluster removed while the action was running");
                    self.executor.settle(&prepared, &outcome)
                }
                Err(e) => {
                    warn!(cluster = %name, error = %e, "Failed to reload cluster after action");
                    self.executor.settle(&prepared, &outcome)
                }
            };
            self.gate
                .complete(name, &executed.rule_name, executed.success);
            executed
        };

        self.metrics.inc_actions_executed(&executed);
        self.logger.log_action_executed(name, &executed);
        if matches!(
            prepared.step,
            Step::Scale { .. } | Step::Create { .. } | Step::Optimize { .. }
        ) {
            if executed.success {
                self.health.set_healthy(Component::ControlPlane).await;
            } else {
                self.health
                    .set_degraded(
                        Component::ControlPlane,
                        executed.error_message.clone().unwrap_or_default(),
                    )
                    .await;
            }
        }
        executed
    }

    fn defer(
        &self,
        namespace: &str,
        name: &str,
        action: RemediationAction,
        severity: Severity,
        disposition: GateDisposition,
        remaining: Duration,
    ) -> ActionOutcome {
        let due_at = self.clock.now()
            + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero());
        let rule = action.rule_name.clone();
        let deferred = DeferredAction::new(namespace, name, action.clone(), severity, due_at);

        match self.scheduler.schedule(deferred, remaining + DEFERRED_GRACE) {
            ScheduleOutcome::Scheduled { .. } => {
                self.logger.log_deferred_scheduled(name, &rule, remaining);
                self.metrics
                    .set_deferred_pending(self.scheduler.pending_count() as i64);
                ActionOutcome::new(
                    action,
                    disposition,
                    ExecutionStatus::Deferred,
                    Some(format!("retry in {}s", remaining.as_secs())),
                )
            }
            ScheduleOutcome::Coalesced => ActionOutcome::new(
                action,
                disposition,
                ExecutionStatus::Coalesced,
                Some("retry already scheduled".to_string()),
            ),
        }
    }

    /// Consume deferred actions until shutdown
    pub async fn run_deferred(
        self: Arc<Self>,
        mut deferred_rx: mpsc::Receiver<DeferredAction>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!("Starting deferred action loop");
        self.health.set_healthy(Component::RetryScheduler).await;

        loop {
            tokio::select! {
                delivered = deferred_rx.recv() => match delivered {
                    Some(deferred) => {
                        let controller = Arc::clone(&self);
                        tokio::spawn(async move {
                            controller.execute_deferred(deferred).await;
                        });
                    }
                    None => {
                        self.health
                            .set_unhealthy(Component::RetryScheduler, "deferred queue closed")
                            .await;
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    info!("Shutting down deferred action loop");
                    break;
                }
            }
        }
    }

    /// Re-validate and run one delivered deferred action
    pub async fn execute_deferred(self: &Arc<Self>, deferred: DeferredAction) -> ActionOutcome {
        let namespace = deferred.namespace.as_str();
        let name = deferred.cluster.as_str();
        let rule = deferred.action.rule_name.clone();

        if !self.scheduler.take(&deferred) {
            self.logger.log_deferred_dropped(name, &rule, "stale");
            return ActionOutcome::skipped(deferred.action, None, "stale deferred entry");
        }
        self.metrics
            .set_deferred_pending(self.scheduler.pending_count() as i64);

        let guard = self.locks.acquire(namespace, name).await;
        let record = match self.load(namespace, name).await {
            Ok(Some(record)) if record.status.phase != Phase::Deleting => record,
            Ok(_) => return self.drop_deferred(deferred, None, "cluster no longer exists"),
            Err(e) => {
                let reason = format!("store unavailable: {}", e);
                return self.drop_deferred(deferred, None, &reason);
            }
        };

        if let Err(reason) = still_relevant(&record, &deferred.action) {
            return self.drop_deferred(deferred, None, reason);
        }

        let disposition = self.evaluate(&record, &deferred.action, deferred.severity);
        if !disposition.permits_execution() {
            let reason = format!("gate returned {}", disposition.as_str());
            return self.drop_deferred(deferred, Some(disposition), &reason);
        }

        match self
            .run_permitted(guard, record, deferred.action.clone(), disposition, true)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = format!("execution aborted: {}", e);
                self.drop_deferred(deferred, Some(disposition), &reason)
            }
        }
    }

    fn drop_deferred(
        &self,
        deferred: DeferredAction,
        disposition: Option<GateDisposition>,
        reason: &str,
    ) -> ActionOutcome {
        self.logger
            .log_deferred_dropped(&deferred.cluster, &deferred.action.rule_name, reason);
        ActionOutcome::skipped(deferred.action, disposition, reason)
    }

    /// Deferred actions waiting for their cooldown, soonest first
    pub fn pending_deferred(&self) -> Vec<DeferredAction> {
        self.scheduler.pending()
    }

    /// Create a cluster record and ask the control plane to provision it
    pub async fn provision(&self, request: ClusterRequest) -> RemediationResult<ClusterRecord> {
        request.validate()?;
        let namespace = self.resolve_namespace(request.namespace.as_deref());
        let name = request.cluster_name.trim().to_string();
        let now = self.clock.now();

        let mut auto_scaling = AutoScaling::default();
        auto_scaling.min_nodes = auto_scaling.min_nodes.min(request.node_count);
        auto_scaling.max_nodes = auto_scaling.max_nodes.max(request.node_count);
        let spec = ClusterSpec {
            cluster_name: name.clone(),
            node_count: request.node_count,
            version: request.resolved_version(),
            instance_class: request
                .instance_class
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTANCE_CLASS.to_string()),
            thresholds: Some(Thresholds::default()),
            auto_scaling,
            remediation_rules: Vec::new(),
        };
        spec.validate()?;

        let record = {
            let _guard = self.locks.acquire(&namespace, &name).await;
            if self.load(&namespace, &name).await?.is_some() {
                return Err(StoreError::Conflict(format!("{}/{}", namespace, name)).into());
            }
            let mut record = ClusterRecord::new(&name, &namespace, spec, Phase::Pending, now);
            record.transition(PhaseEvent::ProvisionStarted, now)?;
            self.persist(&record).await?
        };
        self.refresh_cluster_count().await;

        let created = self.control_plane.create(&record.spec).await;
        let success = matches!(created, Ok(true));
        if let Err(e) = &created {
            warn!(cluster = %name, error = %e, "Control plane create failed");
        }
        self.logger
            .log_cluster_provisioned(&name, &namespace, record.spec.node_count, success);
        if success {
            return Ok(record);
        }

        let _guard = self.locks.acquire(&namespace, &name).await;
        let Some(mut record) = self.load(&namespace, &name).await? else {
            return Ok(record);
        };
        if record.status.phase.apply(PhaseEvent::ProvisionFailed).is_ok() {
            record.transition(PhaseEvent::ProvisionFailed, self.clock.now())?;
            self.persist_status(&record).await?;
        }
        Ok(record)
    }

    /// Delete a cluster; returns `false` when no record exists
    pub async fn delete(&self, namespace: &str, name: &str) -> RemediationResult<bool> {
        {
            let _guard = self.locks.acquire(namespace, name).await;
            let Some(mut record) = self.load(namespace, name).await? else {
                return Ok(false);
            };
            record.transition(PhaseEvent::DeleteRequested, self.clock.now())?;
            self.persist_status(&record).await?;
        }

        match self.control_plane.delete(name).await {
            Ok(existed) => {
                if !existed {
                    debug!(cluster = %name, "Control plane did not know the cluster");
                }
            }
            Err(e) => {
                self.health
                    .set_degraded(Component::ControlPlane, e.to_string())
                    .await;
                return Err(RemediationError::ControlPlane(format!(
                    "failed to delete {}: {}",
                    name, e
                )));
            }
        }

        {
            let _guard = self.locks.acquire(namespace, name).await;
            let removed = self.store.delete(namespace, name).await;
            self.track_store(removed).await?;
        }
        self.gate.forget_cluster(name);
        let cancelled = self.scheduler.cancel_cluster(namespace, name);
        self.metrics
            .set_deferred_pending(self.scheduler.pending_count() as i64);
        self.logger.log_cluster_deleted(name, namespace, cancelled);
        self.refresh_cluster_count().await;
        Ok(true)
    }

    pub async fn get(&self, namespace: &str, name: &str) -> RemediationResult<Option<ClusterRecord>> {
        self.load(namespace, name).await
    }

    pub async fn list(&self, namespace: Option<&str>) -> RemediationResult<Vec<ClusterRecord>> {
        let records = self.store.list(namespace).await;
        self.track_store(records).await
    }

    /// All recorded cooldowns
    pub fn cooldowns(&self) -> Vec<CooldownEntry> {
        self.gate.get_all_cooldowns()
    }

    pub fn clear_cooldown(&self, cluster: &str, rule: &str) -> bool {
        info!(cluster = %cluster, rule = %rule, "Clearing cooldown");
        self.gate.clear_cooldown(cluster, rule)
    }

    pub fn clear_all_cooldowns(&self, cluster: &str) -> usize {
        info!(cluster = %cluster, "Clearing all cooldowns");
        self.gate.clear_all_cooldowns(cluster)
    }

    fn resolve_namespace(&self, namespace: Option<&str>) -> String {
        namespace
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.config.namespace)
            .to_string()
    }

    /// Control-plane view of the cluster, when phase sync is on
    async fn observe(&self, name: &str) -> Option<ControlPlaneStatus> {
        if !self.config.phase_sync {
            return None;
        }
        match self.control_plane.status(name).await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(cluster = %name, error = %e, "Control plane status unavailable, phase sync skipped");
                self.health
                    .set_degraded(Component::ControlPlane, e.to_string())
                    .await;
                None
            }
        }
    }

    fn apply_sync(&self, record: &mut ClusterRecord, observed: Option<ControlPlaneStatus>) {
        let Some(observed) = observed else {
            return;
        };
        let Some(event) = record.status.phase.sync_event(observed) else {
            debug!(
                cluster = %record.name(),
                phase = %record.status.phase,
                observed = ?observed,
                "Phase in sync with control plane"
            );
            return;
        };

        let from = record.status.phase;
        match record.transition(event, self.clock.now()) {
            Ok(to) => info!(
                cluster = %record.name(),
                from = %from,
                to = %to,
                observed = ?observed,
                "Phase synchronised with control plane"
            ),
            Err(e) => warn!(cluster = %record.name(), error = %e, "Phase sync rejected"),
        }
    }

    async fn load(&self, namespace: &str, name: &str) -> RemediationResult<Option<ClusterRecord>> {
        let loaded = self.store.get(namespace, name).await;
        self.track_store(loaded).await
    }

    async fn persist(&self, record: &ClusterRecord) -> RemediationResult<ClusterRecord> {
        let written = self.store.create_or_update(record).await;
        self.track_store(written).await
    }

    async fn persist_status(&self, record: &ClusterRecord) -> RemediationResult<()> {
        let written = self
            .store
            .update_status(record.namespace(), record.name(), &record.status)
            .await;
        self.track_store(written).await.map(|_| ())
    }

    async fn track_store<T>(&self, result: Result<T, StoreError>) -> RemediationResult<T> {
        match result {
            Ok(value) => {
                self.health.set_healthy(Component::ClusterStore).await;
                Ok(value)
            }
            Err(e) => {
                self.health
                    .set_unhealthy(Component::ClusterStore, e.to_string())
                    .await;
                Err(e.into())
            }
        }
    }

    async fn refresh_cluster_count(&self) {
        if let Ok(records) = self.store.list(None).await {
            self.metrics.set_clusters_managed(records.len() as i64);
        }
    }
}

/// Whether a deferred action still makes sense for the current record
fn still_relevant(record: &ClusterRecord, action: &RemediationAction) -> Result<(), &'static str> {
    match action.action_type {
        ActionType::ScaleOut | ActionType::EmergencyScale => {
            if !record.can_scale() {
                return Err("cluster can no longer scale out");
            }
            if action
                .target_nodes
                .map_or(false, |target| record.spec.node_count >= target)
            {
                return Err("target node count already reached");
            }
            Ok(())
        }
        ActionType::ScaleIn => {
            if record.can_scale_in() {
                Ok(())
            } else {
                Err("cluster can no longer scale in")
            }
        }
        _ => Ok(()),
    }
}
