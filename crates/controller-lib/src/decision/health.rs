//! Composite health-score strategy
//!
//! Scores a metric snapshot against the cluster thresholds and builds a
//! multi-action plan per health band:
//! - CRITICAL: emergency scale, backup cluster, critical alert
//! - WARNING: threshold scale out, performance optimization, warning alert
//! - OPTIMIZATION: optimization, preemptive scale out, info alert
//! - HEALTHY: scale in when CPU sits well below the low threshold
//!
//! Events without a metric bundle fall back to the alarm rule engine.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{
    ActionType, AlarmEvent, AlertLevel, ClusterRecord, MetricsBundle, Priority,
    RemediationAction, Severity, Thresholds,
};

use super::{evaluate_custom_rules, order_by_priority, AlarmRuleEngine, RemediationPolicy};

/// Error rate (percent) above which the cluster loses health points
const ERROR_RATE_FLOOR: f64 = 1.0;

/// Health band, least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthLevel {
    Healthy,
    Optimization,
    Warning,
    Critical,
}

/// Outcome of scoring one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub level: HealthLevel,
    pub score: f64,
}

impl HealthAssessment {
    /// Score a snapshot against the thresholds
    pub fn assess(metrics: &MetricsBundle, thresholds: &Thresholds) -> Self {
        let mut score = 100.0_f64;
        let mut level = HealthLevel::Healthy;

        if let Some(cpu) = metrics.cpu.filter(|cpu| *cpu > thresholds.cpu_high) {
            score -= overage_penalty(cpu, thresholds.cpu_high, 30.0);
            level = level.max(if cpu > thresholds.cpu_high * 1.5 {
                HealthLevel::Critical
            } else {
                HealthLevel::Warning
            });
        }

        if let Some(memory) = metrics.memory.filter(|m| *m > thresholds.memory_high) {
            score -= overage_penalty(memory, thresholds.memory_high, 25.0);
            level = level.max(if memory > thresholds.memory_high * 1.4 {
                HealthLevel::Critical
            } else {
                HealthLevel::Warning
            });
        }

        if let Some(latency) = metrics.latency_p95.filter(|l| *l > thresholds.latency_high) {
            score -= overage_penalty(latency, thresholds.latency_high, 25.0);
            level = level.max(if latency > thresholds.latency_high * 2.0 {
                HealthLevel::Critical
            } else {
                HealthLevel::Warning
            });
        }

        if let Some(disk) = metrics.disk.filter(|d| *d > thresholds.disk_high) {
            let headroom = (100.0 - thresholds.disk_high).max(f64::EPSILON);
            score -= ((disk - thresholds.disk_high) / headroom * 20.0).min(20.0);
            level = level.max(if disk > 95.0 {
                HealthLevel::Critical
            } else {
                HealthLevel::Warning
            });
        }

        if let Some(rate) = metrics.query_rate.filter(|q| *q > thresholds.query_rate_high) {
            score -= overage_penalty(rate, thresholds.query_rate_high, 15.0);
            level = level.max(HealthLevel::Warning);
        }

        if let Some(errors) = metrics.error_rate.filter(|e| *e > ERROR_RATE_FLOOR) {
            score -= (errors * 5.0).min(30.0);
            level = level.max(if errors > 5.0 {
                HealthLevel::Critical
            } else {
                HealthLevel::Warning
            });
        }

        let banded = if score < 60.0 {
            HealthLevel::Critical
        } else if score < 80.0 {
            HealthLevel::Warning
        } else if score < 95.0 {
            HealthLevel::Optimization
        } else {
            HealthLevel::Healthy
        };

        Self {
            level: level.max(banded),
            score: score.max(0.0),
        }
    }
}

/// Relative overage scaled to `weight`, capped at `weight`
fn overage_penalty(value: f64, threshold: f64, weight: f64) -> f64 {
    if threshold <= 0.0 {
        return weight;
    }
    ((value - threshold) / threshold * weight).min(weight)
}

/// Metric-driven policy producing prioritised multi-action plans
#[derive(Clone, Default)]
pub struct HealthScoreStrategy {
    fallback: AlarmRuleEngine,
}

impl HealthScoreStrategy {
    pub fn new(fallback: AlarmRuleEngine) -> Self {
        Self { fallback }
    }

    fn critical_plan(record: &ClusterRecord, health: &HealthAssessment) -> Vec<RemediationAction> {
        let mut actions = Vec::new();
        if record.can_scale() {
            let target = record
                .spec
                .node_count
                .saturating_mul(2)
                .min(record.max_nodes());
            actions.push(
                RemediationAction::new(
                    ActionType::EmergencyScale,
                    Priority::Immediate,
                    "emergency-scale",
                    "Critical cluster health - emergency scaling",
                )
                .with_target_nodes(target),
            );
        }
        actions.push(RemediationAction::new(
            ActionType::CreateNewCluster,
            Priority::Critical,
            "critical-backup-cluster",
            "Critical health - creating backup cluster",
        ));
        actions.push(
            RemediationAction::new(
                ActionType::AlertCritical,
                Priority::Immediate,
                "critical-alert",
                format!("Critical cluster health (score: {:.1})", health.score),
            )
            .with_alert_level(AlertLevel::Critical),
        );
        actions
    }

    fn warning_plan(
        record: &ClusterRecord,
        metrics: &MetricsBundle,
        thresholds: &Thresholds,
        health: &HealthAssessment,
    ) -> Vec<RemediationAction> {
        let mut actions = Vec::new();

        let over = |value: Option<f64>, limit: f64| value.map_or(false, |v| v > limit);
        let needs_scale_out = over(metrics.cpu, thresholds.cpu_high)
            || over(metrics.memory, thresholds.memory_high)
            || over(metrics.latency_p95, thresholds.latency_high);
        if needs_scale_out && record.can_scale() {
            actions.push(
                RemediationAction::new(
                    ActionType::ScaleOut,
                    Priority::High,
                    "threshold-scale-out",
                    "Resource utilization exceeds thresholds",
                )
                .with_target_nodes((record.spec.node_count + 1).min(record.max_nodes())),
            );
        }

        actions.extend(optimization_action(metrics, thresholds));
        actions.push(
            RemediationAction::new(
                ActionType::Alert,
                Priority::High,
                "warning-alert",
                format!("Cluster health degraded (score: {:.1})", health.score),
            )
            .with_alert_level(AlertLevel::Warning),
        );
        actions
    }

    fn optimization_plan(
        record: &ClusterRecord,
        metrics: &MetricsBundle,
        thresholds: &Thresholds,
        health: &HealthAssessment,
    ) -> Vec<RemediationAction> {
        let mut actions: Vec<RemediationAction> =
            optimization_action(metrics, thresholds).into_iter().collect();

        let approaching = |value: Option<f64>, limit: f64| value.map_or(false, |v| v > limit * 0.9);
        if (approaching(metrics.cpu, thresholds.cpu_high)
            || approaching(metrics.memory, thresholds.memory_high))
            && record.can_scale()
        {
            actions.push(
                RemediationAction::new(
                    ActionType::ScaleOut,
                    Priority::Low,
                    "preemptive-scale-out",
                    "Metrics approaching thresholds - preemptive scaling",
                )
                .with_target_nodes(record.spec.node_count + 1),
            );
        }

        actions.push(
            RemediationAction::new(
                ActionType::Alert,
                Priority::Low,
                "optimization-alert",
                format!("Cluster optimization opportunity (score: {:.1})", health.score),
            )
            .with_alert_level(AlertLevel::Info),
        );
        actions
    }

    fn healthy_plan(
        record: &ClusterRecord,
        metrics: &MetricsBundle,
        thresholds: &Thresholds,
    ) -> Vec<RemediationAction> {
        match metrics.cpu {
            Some(cpu) if cpu < thresholds.cpu_low * 0.7 && record.can_scale_in() => {
                vec![RemediationAction::new(
                    ActionType::ScaleIn,
                    Priority::Low,
                    "cpu-scale-in",
                    format!("CPU at {:.1}% is well below the low threshold", cpu),
                )
                .with_target_nodes(record.spec.node_count - 1)]
            }
            _ => Vec::new(),
        }
    }
}

/// In-place tuning suggested by the snapshot, if any
fn optimization_action(metrics: &MetricsBundle, thresholds: &Thresholds) -> Option<RemediationAction> {
    let mut optimizations = Vec::new();

    if metrics.latency_p95.map_or(false, |l| l > thresholds.latency_high) {
        optimizations.push("query_cache");
        optimizations.push("field_data_cache");
        if metrics.query_rate.map_or(false, |q| q < 50.0) {
            optimizations.push("refresh_interval");
        }
    }
    if metrics.indexing_rate.map_or(false, |i| i > 1000.0) {
        optimizations.extend(["bulk_size", "flush_threshold", "merge_policy"]);
    }
    if metrics.memory.map_or(false, |m| m > thresholds.memory_high * 0.8) {
        optimizations.extend(["fielddata_limit", "circuit_breaker"]);
    }

    if optimizations.is_empty() {
        return None;
    }
    Some(
        RemediationAction::new(
            ActionType::OptimizeCluster,
            Priority::Medium,
            "performance-optimization",
            "Performance optimization opportunity detected",
        )
        .with_optimizations(optimizations),
    )
}

impl RemediationPolicy for HealthScoreStrategy {
    fn name(&self) -> &'static str {
        "health-score"
    }

    fn plan(
        &self,
        record: &ClusterRecord,
        event: &AlarmEvent,
        severity: Severity,
    ) -> Vec<RemediationAction> {
        if !severity.is_actionable() {
            return Vec::new();
        }
        let (Some(metrics), Some(thresholds)) = (event.metrics.as_ref(), record.spec.thresholds.as_ref())
        else {
            return self.fallback.plan(record, event, severity);
        };

        let health = HealthAssessment::assess(metrics, thresholds);
        info!(
            cluster = %record.name(),
            level = ?health.level,
            score = health.score,
            "Cluster health assessed"
        );

        let mut actions = match health.level {
            HealthLevel::Critical => Self::critical_plan(record, &health),
            HealthLevel::Warning => Self::warning_plan(record, metrics, thresholds, &health),
            HealthLevel::Optimization => {
                Self::optimization_plan(record, metrics, thresholds, &health)
            }
            HealthLevel::Healthy => Self::healthy_plan(record, metrics, thresholds),
        };
        actions.extend(evaluate_custom_rules(record, Some(metrics)));
        order_by_priority(&mut actions);
        actions
    }
}
