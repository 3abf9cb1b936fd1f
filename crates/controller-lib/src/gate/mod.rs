//! Cooldown & state gate
//!
//! Decides whether a proposed action runs now, runs despite its cooldown,
//! is blocked, or is deferred until the cooldown elapses:
//!
//! ```text
//! scaling action and phase != READY        -> BLOCK (state conflict, never bypassed)
//! (cluster, rule) already executing        -> BLOCK (in flight)
//! cooldown expired                         -> EXECUTE
//! cooldown active, severity CRITICAL       -> BYPASS
//! cooldown active, severity below CRITICAL -> DEFER (remaining cooldown)
//! ```
//!
//! EXECUTE and BYPASS reserve the pair until [`CooldownGate::complete`] is
//! called; only a successful completion starts a new cooldown window.

mod cooldown;

pub use cooldown::{CooldownBucket, CooldownPolicy};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::models::{Phase, RemediationAction, Severity};

/// Why an action was blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The cluster phase does not accept scaling work
    StateConflict,
    /// The same (cluster, rule) pair is currently executing
    InFlight,
}

/// Gate verdict for one proposed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateDisposition {
    Execute,
    Bypass,
    #[serde(rename_all = "camelCase")]
    Block { reason: BlockReason, phase: Phase },
    #[serde(rename_all = "camelCase")]
    Defer { remaining_ms: u64 },
}

impl GateDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDisposition::Execute => "EXECUTE",
            GateDisposition::Bypass => "BYPASS",
            GateDisposition::Block { .. } => "BLOCK",
            GateDisposition::Defer { .. } => "DEFER",
        }
    }

    /// Whether the action may run now
    pub fn permits_execution(&self) -> bool {
        matches!(self, GateDisposition::Execute | GateDisposition::Bypass)
    }

    /// Remaining cooldown for a deferred action
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            GateDisposition::Defer { remaining_ms } => Some(Duration::from_millis(*remaining_ms)),
            _ => None,
        }
    }
}

/// Actions the phase machine must be READY for
pub fn is_scaling_class(action: &RemediationAction) -> bool {
    if action.action_type.is_scaling() {
        return true;
    }
    let rule = action.rule_name.to_lowercase();
    rule.contains("scale") || rule.contains("emergency")
}

/// Per-cluster cooldown bookkeeping
#[derive(Debug, Default)]
struct ClusterCooldowns {
    last_executed: HashMap<String, DateTime<Utc>>,
    in_flight: HashSet<String>,
}

/// Snapshot of one recorded cooldown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub cluster: String,
    pub rule: String,
    pub bucket: CooldownBucket,
    pub last_executed: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remaining_secs: u64,
    pub active: bool,
}

/// Stateful cooldown & state gate
pub struct CooldownGate {
    tracker: DashMap<String, ClusterCooldowns>,
    policy: CooldownPolicy,
    clock: Arc<dyn Clock>,
}

impl CooldownGate {
    pub fn new(policy: CooldownPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            tracker: DashMap::new(),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// Evaluate an action against the cluster's phase and cooldown history
    pub fn evaluate(
        &self,
        cluster: &str,
        action: &RemediationAction,
        phase: Phase,
        severity: Severity,
    ) -> GateDisposition {
        if is_scaling_class(action) && phase.is_busy() {
            return GateDisposition::Block {
                reason: BlockReason::StateConflict,
                phase,
            };
        }

        let now = self.clock.now();
        let cooldown = self.policy.duration_for_rule(&action.rule_name);
        let rule = action.rule_name.as_str();

        let mut entry = self.tracker.entry(cluster.to_string()).or_default();
        if entry.in_flight.contains(rule) {
            return GateDisposition::Block {
                reason: BlockReason::InFlight,
                phase,
            };
        }

        let remaining = entry
            .last_executed
            .get(rule)
            .and_then(|last| remaining_cooldown(now, *last, cooldown));

        let disposition = match remaining {
            None => GateDisposition::Execute,
            Some(_) if severity == Severity::Critical => GateDisposition::Bypass,
            Some(left) => GateDisposition::Defer {
                remaining_ms: left.as_millis() as u64,
            },
        };
        if disposition.permits_execution() {
            entry.in_flight.insert(rule.to_string());
        }
        disposition
    }

    /// Release the reservation; success starts a new cooldown window
    pub fn complete(&self, cluster: &str, rule: &str, success: bool) {
        let now = self.clock.now();
        let mut entry = self.tracker.entry(cluster.to_string()).or_default();
        entry.in_flight.remove(rule);
        if success {
            entry.last_executed.insert(rule.to_string(), now);
        }
        debug!(cluster = %cluster, rule = %rule, success, "Gate reservation released");
    }

    /// Record a successful execution at the current time
    pub fn record_execution(&self, cluster: &str, rule: &str) {
        let now = self.clock.now();
        self.tracker
            .entry(cluster.to_string())
            .or_default()
            .last_executed
            .insert(rule.to_string(), now);
    }

    /// Remaining cooldown for a pair, `None` when expired or never executed
    pub fn remaining(&self, cluster: &str, rule: &str) -> Option<Duration> {
        let now = self.clock.now();
        let cooldown = self.policy.duration_for_rule(rule);
        self.tracker.get(cluster).and_then(|entry| {
            entry
                .last_executed
                .get(rule)
                .and_then(|last| remaining_cooldown(now, *last, cooldown))
        })
    }

    /// Forget one pair's cooldown; returns whether one was recorded
    pub fn clear_cooldown(&self, cluster: &str, rule: &str) -> bool {
        self.tracker
            .get_mut(cluster)
            .map(|mut entry| entry.last_executed.remove(rule).is_some())
            .unwrap_or(false)
    }

    /// Forget every cooldown of a cluster; returns how many were removed
    pub fn clear_all_cooldowns(&self, cluster: &str) -> usize {
        self.tracker
            .get_mut(cluster)
            .map(|mut entry| {
                let cleared = entry.last_executed.len();
                entry.last_executed.clear();
                cleared
            })
            .unwrap_or(0)
    }

    /// Drop all bookkeeping for a deleted cluster
    pub fn forget_cluster(&self, cluster: &str) {
        self.tracker.remove(cluster);
    }

    /// All recorded cooldowns, sorted by cluster then rule
    pub fn get_all_cooldowns(&self) -> Vec<CooldownEntry> {
        let now = self.clock.now();
        let mut entries: Vec<CooldownEntry> = self
            .tracker
            .iter()
            .flat_map(|cluster| {
                let name = cluster.key().clone();
                cluster
                    .last_executed
                    .iter()
                    .map(|(rule, last)| {
                        let bucket = CooldownBucket::for_rule(rule);
                        let cooldown = self.policy.duration(bucket);
                        let expires_at = *last + to_chrono(cooldown);
                        let remaining = remaining_cooldown(now, *last, cooldown);
                        CooldownEntry {
                            cluster: name.clone(),
                            rule: rule.clone(),
                            bucket,
                            last_executed: *last,
                            expires_at,
                            remaining_secs: remaining.map(|d| d.as_secs()).unwrap_or(0),
                            active: remaining.is_some(),
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        entries.sort_by(|a, b| a.cluster.cmp(&b.cluster).then_with(|| a.rule.cmp(&b.rule)));
        entries
    }

    /// Whether any rule on the cluster is still cooling down
    pub fn has_active_cooldowns(&self, cluster: &str) -> bool {
        let now = self.clock.now();
        self.tracker
            .get(cluster)
            .map(|entry| {
                entry.last_executed.iter().any(|(rule, last)| {
                    remaining_cooldown(now, *last, self.policy.duration_for_rule(rule)).is_some()
                })
            })
            .unwrap_or(false)
    }

    /// Operator override: clear the cooldown so the next evaluation executes
    pub fn force_execute(&self, cluster: &str, rule: &str) -> bool {
        warn!(cluster = %cluster, rule = %rule, "Forcing execution, cooldown cleared");
        self.clear_cooldown(cluster, rule)
    }
}

/// Time left until `last + cooldown`; `None` once `now` is past it
fn remaining_cooldown(
    now: DateTime<Utc>,
    last: DateTime<Utc>,
    cooldown: Duration,
) -> Option<Duration> {
    let expires_at = last + to_chrono(cooldown);
    if now > expires_at {
        None
    } else {
        Some((expires_at - now).to_std().unwrap_or_default())
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::max_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{ActionType, Priority};

    fn gate() -> (CooldownGate, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (CooldownGate::new(CooldownPolicy::new(), clock.clone()), clock)
    }

    fn scale_out() -> RemediationAction {
        RemediationAction::new(
            ActionType::ScaleOut,
            Priority::High,
            "cpu-alarm-scale-out",
            "cpu alarm",
        )
        .with_target_nodes(4)
    }

    fn alert() -> RemediationAction {
        RemediationAction::new(
            ActionType::AlertCritical,
            Priority::Critical,
            "disk-space-alert",
            "disk",
        )
    }

    #[test]
    fn test_first_evaluation_executes_and_reserves() {
        let (gate, _) = gate();
        let action = scale_out();
        assert_eq!(
            gate.evaluate("search-a", &action, Phase::Ready, Severity::High),
            GateDisposition::Execute
        );
        assert_eq!(
            gate.evaluate("search-a", &action, Phase::Ready, Severity::High),
            GateDisposition::Block {
                reason: BlockReason::InFlight,
                phase: Phase::Ready
            }
        );
        assert_eq!(
            gate.evaluate("search-b", &action, Phase::Ready, Severity::High),
            GateDisposition::Execute
        );
    }

    #[test]
    fn test_success_starts_cooldown() {
        let (gate, clock) = gate();
        let action = scale_out();
        gate.evaluate("search-a", &action, Phase::Ready, Severity::High);
        gate.complete("search-a", &action.rule_name, true);

        clock.advance(Duration::from_secs(180));
        let disposition = gate.evaluate("search-a", &action, Phase::Ready, Severity::Medium);
        assert_eq!(disposition, GateDisposition::Defer { remaining_ms: 420_000 });
        assert_eq!(disposition.remaining(), Some(Duration::from_secs(420)));
        assert!(gate.has_active_cooldowns("search-a"));
    }

    #[test]
    fn test_failure_leaves_no_cooldown() {
        let (gate, _) = gate();
        let action = scale_out();
        gate.evaluate("search-a", &action, Phase::Ready, Severity::High);
        gate.complete("search-a", &action.rule_name, false);

        assert_eq!(gate.remaining("search-a", &action.rule_name), None);
        assert_eq!(
            gate.evaluate("search-a", &action, Phase::Ready, Severity::High),
            GateDisposition::Execute
        );
    }

    #[test]
    fn test_critical_bypasses_time_but_not_state() {
        let (gate, _) = gate();
        let action = scale_out();
        gate.record_execution("search-a", &action.rule_name);

        assert_eq!(
            gate.evaluate("search-a", &action, Phase::Ready, Severity::Critical),
            GateDisposition::Bypass
        );
        gate.complete("search-a", &action.rule_name, true);

        assert_eq!(
            gate.evaluate("search-a", &action, Phase::Scaling, Severity::Critical),
            GateDisposition::Block {
                reason: BlockReason::StateConflict,
                phase: Phase::Scaling
            }
        );
    }

    #[test]
    fn test_busy_phases_block_scaling_only() {
        let (gate, _) = gate();
        for phase in [
            Phase::Pending,
            Phase::Creating,
            Phase::Scaling,
            Phase::Error,
            Phase::Deleting,
        ] {
            assert!(matches!(
                gate.evaluate("search-a", &scale_out(), phase, Severity::High),
                GateDisposition::Block {
                    reason: BlockReason::StateConflict,
                    ..
                }
            ));
        }
        assert_eq!(
            gate.evaluate("search-a", &alert(), Phase::Scaling, Severity::Medium),
            GateDisposition::Execute
        );
    }

    #[test]
    fn test_rule_name_marks_scaling_class() {
        let optimize = RemediationAction::new(
            ActionType::OptimizeCluster,
            Priority::Medium,
            "latency-alarm-optimization",
            "latency",
        );
        assert!(!is_scaling_class(&optimize));
        let named = RemediationAction::new(ActionType::Alert, Priority::Low, "emergency-notice", "x");
        assert!(is_scaling_class(&named));
    }

    #[test]
    fn test_cooldown_expires_strictly_after_window() {
        let (gate, clock) = gate();
        let action = scale_out();
        gate.record_execution("search-a", &action.rule_name);

        clock.advance(Duration::from_secs(600));
        assert_eq!(gate.remaining("search-a", &action.rule_name), Some(Duration::ZERO));

        clock.advance(Duration::from_millis(1));
        assert_eq!(gate.remaining("search-a", &action.rule_name), None);
        assert_eq!(
            gate.evaluate("search-a", &action, Phase::Ready, Severity::Medium),
            GateDisposition::Execute
        );
    }

    #[test]
    fn test_admin_accessors() {
        let (gate, clock) = gate();
        gate.record_execution("search-a", "cpu-alarm-scale-out");
        gate.record_execution("search-a", "disk-space-alert");
        gate.record_execution("search-b", "emergency-scale");

        clock.advance(Duration::from_secs(400));
        let all = gate.get_all_cooldowns();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].cluster, "search-a");
        assert_eq!(all[0].rule, "cpu-alarm-scale-out");
        assert!(all[0].active);
        assert_eq!(all[0].remaining_secs, 200);
        assert_eq!(all[1].rule, "disk-space-alert");
        assert!(!all[1].active);
        assert_eq!(all[2].bucket, CooldownBucket::EmergencyScale);
        assert!(!all[2].active);

        assert!(gate.force_execute("search-a", "cpu-alarm-scale-out"));
        assert!(!gate.clear_cooldown("search-a", "cpu-alarm-scale-out"));
        assert!(!gate.has_active_cooldowns("search-a"));

        assert_eq!(gate.clear_all_cooldowns("search-a"), 1);
        assert_eq!(gate.clear_all_cooldowns("unknown"), 0);
        assert_eq!(gate.get_all_cooldowns().len(), 1);
    }

    #[test]
    fn test_disposition_wire_format() {
        let json = serde_json::to_value(GateDisposition::Defer { remaining_ms: 1500 }).unwrap();
        assert_eq!(json["disposition"], "DEFER");
        assert_eq!(json["remainingMs"], 1500);

        let json = serde_json::to_value(GateDisposition::Block {
            reason: BlockReason::StateConflict,
            phase: Phase::Scaling,
        })
        .unwrap();
        assert_eq!(json["reason"], "state_conflict");
        assert_eq!(json["phase"], "Scaling");
    }
}
