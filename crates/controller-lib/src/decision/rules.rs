//! Alarm rule engine
//!
//! Maps one alarm to at most one action. Categories are looked up in an
//! ordered pattern table over the lower-cased alarm name:
//!
//! ```text
//! cpu | memory -> Compute  (scale out, emergency scale when CRITICAL)
//! latency      -> Latency  (new cluster when CRITICAL, else scale out or optimize)
//! disk         -> Disk     (critical alert only)
//! ```

use crate::models::{
    ActionType, AlarmEvent, AlertLevel, ClusterRecord, Priority, RemediationAction, Severity,
};
use crate::observability::StructuredLogger;

use super::RemediationPolicy;

/// In-place optimizations applied when a latency alarm cannot scale out
pub const LATENCY_OPTIMIZATIONS: [&str; 3] = ["refresh_interval", "merge_policy", "index_settings"];

/// Alarm families recognised by the rule engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmCategory {
    Compute,
    Latency,
    Disk,
}

const CATEGORY_PATTERNS: &[(&[&str], AlarmCategory)] = &[
    (&["cpu", "memory"], AlarmCategory::Compute),
    (&["latency"], AlarmCategory::Latency),
    (&["disk"], AlarmCategory::Disk),
];

/// Category of an alarm name and the keyword that matched it
pub fn categorize(alarm_name: &str) -> Option<(AlarmCategory, &'static str)> {
    let name = alarm_name.to_lowercase();
    CATEGORY_PATTERNS.iter().find_map(|(needles, category)| {
        needles
            .iter()
            .find(|needle| name.contains(*needle))
            .map(|needle| (*category, *needle))
    })
}

/// Decide the single action for an alarm, if any
pub fn decide(
    record: &ClusterRecord,
    event: &AlarmEvent,
    severity: Severity,
) -> Option<RemediationAction> {
    if !severity.is_actionable() {
        return None;
    }
    let (category, keyword) = categorize(&event.alarm_name)?;
    let node_count = record.spec.node_count;

    match category {
        AlarmCategory::Compute => {
            if !record.can_scale() {
                return None;
            }
            if severity == Severity::Critical {
                let target = node_count.saturating_mul(2).min(record.max_nodes());
                Some(
                    RemediationAction::new(
                        ActionType::EmergencyScale,
                        Priority::Immediate,
                        "emergency-scale",
                        format!("Critical {} alarm {}", keyword, event.alarm_name),
                    )
                    .with_target_nodes(target),
                )
            } else {
                Some(scale_out(record, keyword, event))
            }
        }
        AlarmCategory::Latency => {
            if severity == Severity::Critical {
                Some(RemediationAction::new(
                    ActionType::CreateNewCluster,
                    Priority::Critical,
                    "critical-latency-alarm-new-cluster",
                    format!("Critical latency alarm {}", event.alarm_name),
                ))
            } else if record.can_scale() {
                Some(scale_out(record, keyword, event))
            } else {
                Some(
                    RemediationAction::new(
                        ActionType::OptimizeCluster,
                        Priority::Medium,
                        "latency-alarm-optimization",
                        format!(
                            "Latency alarm {} on a cluster that cannot scale",
                            event.alarm_name
                        ),
                    )
                    .with_optimizations(LATENCY_OPTIMIZATIONS),
                )
            }
        }
        AlarmCategory::Disk => Some(
            RemediationAction::new(
                ActionType::AlertCritical,
                Priority::Critical,
                "disk-space-alert",
                format!("Disk alarm {}: {}", event.alarm_name, event.reason),
            )
            .with_alert_level(AlertLevel::Critical),
        ),
    }
}

fn scale_out(record: &ClusterRecord, keyword: &str, event: &AlarmEvent) -> RemediationAction {
    RemediationAction::new(
        ActionType::ScaleOut,
        Priority::High,
        format!("{}-alarm-scale-out", keyword),
        format!("{} alarm {}", keyword, event.alarm_name),
    )
    .with_target_nodes(record.spec.node_count + 1)
}

/// Single-alarm policy backed by [`decide`]
#[derive(Clone)]
pub struct AlarmRuleEngine {
    logger: StructuredLogger,
}

impl AlarmRuleEngine {
    pub fn new(logger: StructuredLogger) -> Self {
        Self { logger }
    }
}

impl Default for AlarmRuleEngine {
    fn default() -> Self {
        Self::new(StructuredLogger::default())
    }
}

impl RemediationPolicy for AlarmRuleEngine {
    fn name(&self) -> &'static str {
        "alarm-rules"
    }

    fn plan(
        &self,
        record: &ClusterRecord,
        event: &AlarmEvent,
        severity: Severity,
    ) -> Vec<RemediationAction> {
        if severity.is_actionable() && categorize(&event.alarm_name).is_none() {
            self.logger
                .log_unrecognized_alarm(record.name(), &event.alarm_name, severity);
            return Vec::new();
        }
        decide(record, event, severity).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlarmState, Phase, DEFAULT_NAMESPACE};
    use chrono::Utc;

    fn cluster(node_count: u32, max_nodes: u32, phase: Phase) -> ClusterRecord {
        let mut record = ClusterRecord::with_defaults("search-a", DEFAULT_NAMESPACE, Utc::now());
        record.spec.node_count = node_count;
        record.status.node_count = node_count;
        record.spec.auto_scaling.max_nodes = max_nodes;
        record.status.phase = phase;
        record
    }

    fn alarm(name: &str) -> AlarmEvent {
        AlarmEvent {
            cluster_name: "search-a".to_string(),
            namespace: None,
            timestamp: Utc::now(),
            alarm_name: name.to_string(),
            state: AlarmState::Alarm,
            comparison_operator: "GreaterThanThreshold".to_string(),
            threshold: 80.0,
            value: 95.0,
            reason: "Threshold crossed".to_string(),
            metrics: None,
        }
    }

    #[test]
    fn test_cpu_high_scales_out_by_one() {
        let action = decide(&cluster(3, 10, Phase::Ready), &alarm("cpu-high"), Severity::High)
            .expect("action");
        assert_eq!(action.action_type, ActionType::ScaleOut);
        assert_eq!(action.target_nodes, Some(4));
        assert_eq!(action.priority, Priority::High);
        assert_eq!(action.rule_name, "cpu-alarm-scale-out");
    }

    #[test]
    fn test_critical_compute_doubles_up_to_max() {
        for (nodes, max, expected) in [(3, 10, 6), (6, 10, 10), (9, 10, 10), (2, 3, 3)] {
            let action = decide(
                &cluster(nodes, max, Phase::Ready),
                &alarm("cpu-critical"),
                Severity::Critical,
            )
            .expect("action");
            assert_eq!(action.action_type, ActionType::EmergencyScale);
            assert_eq!(action.target_nodes, Some(expected));
            assert_eq!(action.priority, Priority::Immediate);
            assert_eq!(action.rule_name, "emergency-scale");
        }
    }

    #[test]
    fn test_memory_alarm_uses_memory_rule_name() {
        let action = decide(&cluster(3, 10, Phase::Ready), &alarm("memory-high"), Severity::High)
            .expect("action");
        assert_eq!(action.rule_name, "memory-alarm-scale-out");
    }

    #[test]
    fn test_no_scale_out_at_max() {
        let record = cluster(10, 10, Phase::Ready);
        for severity in [Severity::Critical, Severity::High, Severity::Warning, Severity::Medium] {
            for name in ["cpu-high", "memory-critical", "latency-warning"] {
                if let Some(action) = decide(&record, &alarm(name), severity) {
                    assert!(
                        !matches!(
                            action.action_type,
                            ActionType::ScaleOut | ActionType::EmergencyScale
                        ),
                        "{} {:?} produced {:?}",
                        name,
                        severity,
                        action.action_type
                    );
                }
            }
        }
    }

    #[test]
    fn test_compute_alarm_on_busy_cluster_is_no_action() {
        assert!(decide(&cluster(3, 10, Phase::Scaling), &alarm("cpu-high"), Severity::High).is_none());
    }

    #[test]
    fn test_critical_latency_creates_new_cluster() {
        let action = decide(
            &cluster(3, 10, Phase::Ready),
            &alarm("latency-critical"),
            Severity::Critical,
        )
        .expect("action");
        assert_eq!(action.action_type, ActionType::CreateNewCluster);
        assert_eq!(action.priority, Priority::Critical);
        assert_eq!(action.rule_name, "critical-latency-alarm-new-cluster");
    }

    #[test]
    fn test_latency_without_headroom_optimizes() {
        let action = decide(&cluster(10, 10, Phase::Ready), &alarm("latency-high"), Severity::High)
            .expect("action");
        assert_eq!(action.action_type, ActionType::OptimizeCluster);
        assert_eq!(action.priority, Priority::Medium);
        assert_eq!(
            action.optimizations,
            vec!["refresh_interval", "merge_policy", "index_settings"]
        );

        let action = decide(&cluster(3, 10, Phase::Ready), &alarm("latency-high"), Severity::High)
            .expect("action");
        assert_eq!(action.action_type, ActionType::ScaleOut);
        assert_eq!(action.rule_name, "latency-alarm-scale-out");
    }

    #[test]
    fn test_disk_alarm_always_escalates() {
        for record in [cluster(3, 10, Phase::Ready), cluster(10, 10, Phase::Scaling)] {
            for severity in [Severity::Medium, Severity::Critical] {
                let action = decide(&record, &alarm("disk-full"), severity).expect("action");
                assert_eq!(action.action_type, ActionType::AlertCritical);
                assert_eq!(action.alert_level, Some(AlertLevel::Critical));
                assert_eq!(action.priority, Priority::Critical);
                assert_eq!(action.rule_name, "disk-space-alert");
            }
        }
    }

    #[test]
    fn test_unrecognized_and_inactive_alarms() {
        let engine = AlarmRuleEngine::default();
        let record = cluster(3, 10, Phase::Ready);
        assert!(engine
            .plan(&record, &alarm("shard-relocation"), Severity::Medium)
            .is_empty());
        assert!(engine.plan(&record, &alarm("cpu-high"), Severity::Ok).is_empty());
        assert_eq!(engine.plan(&record, &alarm("cpu-high"), Severity::High).len(), 1);
    }

    #[test]
    fn test_categorize_is_first_match() {
        assert_eq!(
            categorize("CPU-latency-spike"),
            Some((AlarmCategory::Compute, "cpu"))
        );
        assert_eq!(categorize("p99-latency"), Some((AlarmCategory::Latency, "latency")));
        assert_eq!(categorize("jvm-gc"), None);
    }
}
