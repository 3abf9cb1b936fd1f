//! Remediation decision policies
//!
//! This module provides:
//! - The alarm rule engine (one alarm, at most one action)
//! - The composite health-score strategy (metric bundle, prioritised plan)
//! - Operator-defined custom rules evaluated against metric snapshots

mod custom;
mod health;
mod rules;

pub use custom::{evaluate_custom_rules, Condition, ConditionError, RuleContext};
pub use health::{HealthAssessment, HealthLevel, HealthScoreStrategy};
pub use rules::{categorize, decide, AlarmCategory, AlarmRuleEngine, LATENCY_OPTIMIZATIONS};

use crate::models::{AlarmEvent, ClusterRecord, RemediationAction, Severity};

/// A decision policy turns one alarm into a remediation plan
///
/// Plans are ordered by priority; every action still passes through the
/// cooldown gate and the executor individually.
pub trait RemediationPolicy: Send + Sync {
    /// Policy name for logs and configuration
    fn name(&self) -> &'static str;

    /// Remediation plan for this event, possibly empty
    fn plan(
        &self,
        record: &ClusterRecord,
        event: &AlarmEvent,
        severity: Severity,
    ) -> Vec<RemediationAction>;
}

/// Stable sort by priority, most urgent first
pub fn order_by_priority(actions: &mut [RemediationAction]) {
    actions.sort_by_key(|action| action.priority);
}
