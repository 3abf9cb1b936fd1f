//! Observability infrastructure for the remediation controller
//!
//! Provides:
//! - Prometheus metrics (alarms, decisions, gate verdicts, executions, reconcile latency)
//! - Structured JSON logging with tracing, one event per control-loop milestone

use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::gate::GateDisposition;
use crate::models::{RemediationAction, Severity};

/// Histogram buckets for reconciliation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ControllerMetricsInner> = OnceLock::new();

struct ControllerMetricsInner {
    alarms_received: IntCounterVec,
    actions_decided: IntCounterVec,
    gate_dispositions: IntCounterVec,
    actions_executed: IntCounterVec,
    reconcile_latency_seconds: Histogram,
    deferred_pending: IntGauge,
    clusters_managed: IntGauge,
}

impl ControllerMetricsInner {
    fn new() -> Self {
        Self {
            alarms_received: register_int_counter_vec!(
                "search_remediator_alarms_received_total",
                "Alarm events received, by classified severity",
                &["severity"]
            )
            .expect("Failed to register alarms_received_total"),

            actions_decided: register_int_counter_vec!(
                "search_remediator_actions_decided_total",
                "Remediation actions proposed by the decision policy",
                &["action"]
            )
            .expect("Failed to register actions_decided_total"),

            gate_dispositions: register_int_counter_vec!(
                "search_remediator_gate_dispositions_total",
                "Cooldown gate verdicts",
                &["disposition"]
            )
            .expect("Failed to register gate_dispositions_total"),

            actions_executed: register_int_counter_vec!(
                "search_remediator_actions_executed_total",
                "Executed remediation actions, by outcome",
                &["action", "outcome"]
            )
            .expect("Failed to register actions_executed_total"),

            reconcile_latency_seconds: register_histogram!(
                "search_remediator_reconcile_latency_seconds",
                "Time spent reconciling one alarm event",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register reconcile_latency_seconds"),

            deferred_pending: register_int_gauge!(
                "search_remediator_deferred_pending",
                "Deferred actions waiting for their cooldown to elapse"
            )
            .expect("Failed to register deferred_pending"),

            clusters_managed: register_int_gauge!(
                "search_remediator_clusters_managed",
                "Cluster records known to the controller"
            )
            .expect("Failed to register clusters_managed"),
        }
    }
}

/// Controller metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ControllerMetrics {
    _private: (),
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ControllerMetricsInner {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new)
    }

    pub fn inc_alarms_received(&self, severity: Severity) {
        self.inner()
            .alarms_received
            .with_label_values(&[severity.as_str()])
            .inc();
    }

    pub fn inc_actions_decided(&self, action: &RemediationAction) {
        self.inner()
            .actions_decided
            .with_label_values(&[action.action_type.as_str()])
            .inc();
    }

    pub fn inc_gate_disposition(&self, disposition: &GateDisposition) {
        self.inner()
            .gate_dispositions
            .with_label_values(&[disposition.as_str()])
            .inc();
    }

    pub fn inc_actions_executed(&self, action: &RemediationAction) {
        let outcome = if action.success { "success" } else { "failure" };
        self.inner()
            .actions_executed
            .with_label_values(&[action.action_type.as_str(), outcome])
            .inc();
    }

    pub fn observe_reconcile_latency(&self, duration_secs: f64) {
        self.inner().reconcile_latency_seconds.observe(duration_secs);
    }

    pub fn set_deferred_pending(&self, count: i64) {
        self.inner().deferred_pending.set(count);
    }

    pub fn set_clusters_managed(&self, count: i64) {
        self.inner().clusters_managed.set(count);
    }
}

/// Structured logger for control-loop events
///
/// Keeps field names consistent across the classifier, gate, executor
/// and scheduler so log pipelines can key on `event`.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("search-remediator")
    }
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_alarm_received(&self, cluster: &str, alarm_name: &str, severity: Severity) {
        info!(
            event = "alarm_received",
            instance = %self.instance,
            cluster = %cluster,
            alarm = %alarm_name,
            severity = %severity,
            "Alarm received"
        );
    }

    pub fn log_action_decided(&self, cluster: &str, action: &RemediationAction) {
        info!(
            event = "action_decided",
            instance = %self.instance,
            cluster = %cluster,
            action = %action.action_type,
            rule = %action.rule_name,
            priority = ?action.priority,
            target_nodes = ?action.target_nodes,
            reason = %action.reason,
            "Remediation action decided"
        );
    }

    pub fn log_unrecognized_alarm(&self, cluster: &str, alarm_name: &str, severity: Severity) {
        warn!(
            event = "unrecognized_alarm",
            instance = %self.instance,
            cluster = %cluster,
            alarm = %alarm_name,
            severity = %severity,
            "No remediation rule matches alarm"
        );
    }

    /// State conflicts on CRITICAL alarms are logged at error level
    pub fn log_gate_disposition(
        &self,
        cluster: &str,
        action: &RemediationAction,
        severity: Severity,
        disposition: &GateDisposition,
    ) {
        match disposition {
            GateDisposition::Block { reason, phase } if severity == Severity::Critical => {
                error!(
                    event = "gate_disposition",
                    instance = %self.instance,
                    cluster = %cluster,
                    rule = %action.rule_name,
                    disposition = disposition.as_str(),
                    reason = ?reason,
                    phase = %phase,
                    severity = %severity,
                    "Critical remediation blocked"
                );
            }
            GateDisposition::Block { reason, phase } => {
                warn!(
                    event = "gate_disposition",
                    instance = %self.instance,
                    cluster = %cluster,
                    rule = %action.rule_name,
                    disposition = disposition.as_str(),
                    reason = ?reason,
                    phase = %phase,
                    severity = %severity,
                    "Remediation blocked"
                );
            }
            GateDisposition::Bypass => {
                warn!(
                    event = "gate_disposition",
                    instance = %self.instance,
                    cluster = %cluster,
                    rule = %action.rule_name,
                    disposition = disposition.as_str(),
                    severity = %severity,
                    "Cooldown bypassed for critical alarm"
                );
            }
            _ => {
                info!(
                    event = "gate_disposition",
                    instance = %self.instance,
                    cluster = %cluster,
                    rule = %action.rule_name,
                    disposition = disposition.as_str(),
                    remaining_ms = ?disposition.remaining().map(|d| d.as_millis()),
                    severity = %severity,
                    "Gate evaluated"
                );
            }
        }
    }

    pub fn log_action_executed(&self, cluster: &str, action: &RemediationAction) {
        if action.success {
            info!(
                event = "action_executed",
                instance = %self.instance,
                cluster = %cluster,
                action = %action.action_type,
                rule = %action.rule_name,
                target_nodes = ?action.target_nodes,
                "Remediation action executed"
            );
        } else {
            warn!(
                event = "action_failed",
                instance = %self.instance,
                cluster = %cluster,
                action = %action.action_type,
                rule = %action.rule_name,
                error = ?action.error_message,
                "Remediation action failed"
            );
        }
    }

    pub fn log_deferred_scheduled(&self, cluster: &str, rule: &str, delay: Duration) {
        info!(
            event = "deferred_scheduled",
            instance = %self.instance,
            cluster = %cluster,
            rule = %rule,
            delay_ms = delay.as_millis() as u64,
            "Action deferred until cooldown elapses"
        );
    }

    pub fn log_deferred_dropped(&self, cluster: &str, rule: &str, reason: &str) {
        info!(
            event = "deferred_dropped",
            instance = %self.instance,
            cluster = %cluster,
            rule = %rule,
            reason = %reason,
            "Deferred action dropped"
        );
    }

    pub fn log_cluster_provisioned(&self, cluster: &str, namespace: &str, nodes: u32, success: bool) {
        if success {
            info!(
                event = "cluster_provisioned",
                instance = %self.instance,
                cluster = %cluster,
                namespace = %namespace,
                nodes,
                "Cluster provisioning started"
            );
        } else {
            warn!(
                event = "cluster_provisioned",
                instance = %self.instance,
                cluster = %cluster,
                namespace = %namespace,
                nodes,
                "Cluster provisioning rejected by control plane"
            );
        }
    }

    pub fn log_cluster_deleted(&self, cluster: &str, namespace: &str, cancelled_deferred: usize) {
        info!(
            event = "cluster_deleted",
            instance = %self.instance,
            cluster = %cluster,
            namespace = %namespace,
            cancelled_deferred,
            "Cluster deleted"
        );
    }

    pub fn log_startup(&self, version: &str, strategy: &str) {
        info!(
            event = "controller_started",
            instance = %self.instance,
            controller_version = %version,
            strategy = %strategy,
            "Search remediator started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "controller_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Search remediator shutting down"
        );
    }
}
