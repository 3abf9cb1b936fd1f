//! Core data models for the search cluster remediator
//!
//! Alarm events arrive from the monitoring side, cluster records live in the
//! cluster-state store, and remediation actions flow from the decision
//! policies through the gate into the executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RemediationError, RemediationResult};

/// Namespace used when neither the event nor the request names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default node count for a cluster first seen through an alarm
pub const DEFAULT_NODE_COUNT: u32 = 3;

/// Replacement clusters never start larger than this
pub const MAX_REPLICA_NODES: u32 = 3;

/// State reported by the monitoring system for one alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Alarm,
    Ok,
    InsufficientData,
}

/// Raw metric snapshot that may accompany an alarm
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_p95: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_rate: Option<f64>,
}

/// One alarm state transition for one cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmEvent {
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub alarm_name: String,
    pub state: AlarmState,
    #[serde(default)]
    pub comparison_operator: String,
    pub threshold: f64,
    pub value: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsBundle>,
}

impl AlarmEvent {
    /// Reject events that cannot be attributed or compared
    pub fn validate(&self) -> RemediationResult<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(RemediationError::InvalidEvent(
                "clusterName must not be empty".to_string(),
            ));
        }
        if self.alarm_name.trim().is_empty() {
            return Err(RemediationError::InvalidEvent(format!(
                "alarmName must not be empty for cluster {}",
                self.cluster_name
            )));
        }
        if !self.value.is_finite() || !self.threshold.is_finite() {
            return Err(RemediationError::InvalidEvent(format!(
                "alarm {} carries a non-finite value or threshold",
                self.alarm_name
            )));
        }
        Ok(())
    }

    /// Short human-readable summary stored on the cluster status
    pub fn summary(&self) -> String {
        format!(
            "{} {:?} (value {} vs threshold {})",
            self.alarm_name, self.state, self.value, self.threshold
        )
    }
}

/// Per-metric thresholds declared on the cluster spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub cpu_high: f64,
    pub cpu_low: f64,
    pub memory_high: f64,
    pub memory_low: f64,
    pub disk_high: f64,
    pub latency_high: f64,
    pub query_rate_high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_high: 80.0,
            cpu_low: 30.0,
            memory_high: 85.0,
            memory_low: 40.0,
            disk_high: 90.0,
            latency_high: 200.0,
            query_rate_high: 100.0,
        }
    }
}

/// Autoscaling bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScaling {
    pub enabled: bool,
    pub min_nodes: u32,
    pub max_nodes: u32,
    #[serde(default = "default_cooldown_period")]
    pub cooldown_period: String,
}

fn default_cooldown_period() -> String {
    "10m".to_string()
}

impl Default for AutoScaling {
    fn default() -> Self {
        Self {
            enabled: true,
            min_nodes: 2,
            max_nodes: 10,
            cooldown_period: default_cooldown_period(),
        }
    }
}

/// Operator-supplied rule evaluated alongside the built-in policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationRule {
    pub name: String,
    pub condition: String,
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// Declared shape of a managed cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub cluster_name: String,
    pub node_count: u32,
    pub version: String,
    pub instance_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    #[serde(default)]
    pub auto_scaling: AutoScaling,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation_rules: Vec<RemediationRule>,
}

impl ClusterSpec {
    /// Check node count and autoscaling bounds
    pub fn validate(&self) -> RemediationResult<()> {
        if self.node_count < 1 {
            return Err(RemediationError::InvalidSpec(format!(
                "{}: nodeCount must be at least 1",
                self.cluster_name
            )));
        }
        let bounds = &self.auto_scaling;
        if bounds.min_nodes < 1 || bounds.min_nodes > bounds.max_nodes {
            return Err(RemediationError::InvalidSpec(format!(
                "{}: autoscaling bounds {}..{} are inconsistent",
                self.cluster_name, bounds.min_nodes, bounds.max_nodes
            )));
        }
        if bounds.enabled && !(bounds.min_nodes..=bounds.max_nodes).contains(&self.node_count) {
            return Err(RemediationError::InvalidSpec(format!(
                "{}: nodeCount {} outside autoscaling bounds {}..{}",
                self.cluster_name, self.node_count, bounds.min_nodes, bounds.max_nodes
            )));
        }
        Ok(())
    }

    /// Thresholds, or the missing-configuration error
    pub fn require_thresholds(&self) -> RemediationResult<&Thresholds> {
        self.thresholds
            .as_ref()
            .ok_or_else(|| RemediationError::MissingThresholds(self.cluster_name.clone()))
    }

    /// Clamp a node count into the autoscaling bounds
    pub fn clamp_nodes(&self, target: u32) -> u32 {
        target
            .max(self.auto_scaling.min_nodes)
            .min(self.auto_scaling.max_nodes)
    }
}

/// Operational phase of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Pending,
    Creating,
    Ready,
    Scaling,
    Error,
    Deleting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Pending => "Pending",
            Phase::Creating => "Creating",
            Phase::Ready => "Ready",
            Phase::Scaling => "Scaling",
            Phase::Error => "Error",
            Phase::Deleting => "Deleting",
        };
        f.write_str(name)
    }
}

/// Record of the most recent action applied to a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub rule_name: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Observed state of a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    pub phase: Phase,
    pub node_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<LastAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_alarm_info: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_metrics: Option<MetricsBundle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    pub name: String,
    pub namespace: String,
    pub created_at: DateTime<Utc>,
}

/// Spec, status and identity of one managed cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub metadata: ClusterMetadata,
    pub spec: ClusterSpec,
    pub status: ClusterStatus,
}

impl ClusterRecord {
    /// Record created for a cluster first seen through an alarm
    pub fn with_defaults(name: &str, namespace: &str, now: DateTime<Utc>) -> Self {
        let spec = ClusterSpec {
            cluster_name: name.to_string(),
            node_count: DEFAULT_NODE_COUNT,
            version: "OpenSearch_2.11".to_string(),
            instance_class: "m6g.large.search".to_string(),
            thresholds: Some(Thresholds::default()),
            auto_scaling: AutoScaling::default(),
            remediation_rules: Vec::new(),
        };
        Self::new(name, namespace, spec, Phase::Ready, now)
    }

    pub fn new(
        name: &str,
        namespace: &str,
        spec: ClusterSpec,
        phase: Phase,
        now: DateTime<Utc>,
    ) -> Self {
        let node_count = spec.node_count;
        Self {
            metadata: ClusterMetadata {
                name: name.to_string(),
                namespace: namespace.to_string(),
                created_at: now,
            },
            spec,
            status: ClusterStatus {
                phase,
                node_count,
                last_action: None,
                last_alarm_info: None,
                last_updated: now,
                current_metrics: None,
            },
        }
    }

    /// Store and lock key, `namespace/name`
    pub fn key(&self) -> String {
        cluster_key(&self.metadata.namespace, &self.metadata.name)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Autoscaling enabled, cluster READY and below its maximum size
    pub fn can_scale(&self) -> bool {
        self.spec.auto_scaling.enabled
            && self.status.phase == Phase::Ready
            && self.spec.node_count < self.spec.auto_scaling.max_nodes
    }

    /// Autoscaling enabled, cluster READY and above its minimum size
    pub fn can_scale_in(&self) -> bool {
        self.spec.auto_scaling.enabled
            && self.status.phase == Phase::Ready
            && self.spec.node_count > self.spec.auto_scaling.min_nodes
    }

    pub fn max_nodes(&self) -> u32 {
        self.spec.auto_scaling.max_nodes
    }

    pub fn min_nodes(&self) -> u32 {
        self.spec.auto_scaling.min_nodes
    }
}

/// Compose the `namespace/name` key used by the store and the lock table
pub fn cluster_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// Remediation action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    ScaleOut,
    ScaleIn,
    EmergencyScale,
    CreateNewCluster,
    OptimizeCluster,
    Alert,
    AlertCritical,
    NoAction,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ScaleOut => "SCALE_OUT",
            ActionType::ScaleIn => "SCALE_IN",
            ActionType::EmergencyScale => "EMERGENCY_SCALE",
            ActionType::CreateNewCluster => "CREATE_NEW_CLUSTER",
            ActionType::OptimizeCluster => "OPTIMIZE_CLUSTER",
            ActionType::Alert => "ALERT",
            ActionType::AlertCritical => "ALERT_CRITICAL",
            ActionType::NoAction => "NO_ACTION",
        }
    }

    /// Actions that change the node count of the cluster
    pub fn is_scaling(&self) -> bool {
        matches!(
            self,
            ActionType::ScaleOut | ActionType::ScaleIn | ActionType::EmergencyScale
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = RemediationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "SCALE_OUT" => Ok(ActionType::ScaleOut),
            "SCALE_IN" => Ok(ActionType::ScaleIn),
            "EMERGENCY_SCALE" => Ok(ActionType::EmergencyScale),
            "CREATE_NEW_CLUSTER" => Ok(ActionType::CreateNewCluster),
            "OPTIMIZE_CLUSTER" => Ok(ActionType::OptimizeCluster),
            "ALERT" => Ok(ActionType::Alert),
            "ALERT_CRITICAL" => Ok(ActionType::AlertCritical),
            "NO_ACTION" => Ok(ActionType::NoAction),
            _ => Err(RemediationError::InvalidEvent(format!(
                "unknown action type: {}",
                s
            ))),
        }
    }
}

/// Action priority, lower is more urgent
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Immediate = 0,
    Critical = 1,
    High = 2,
    #[default]
    Medium = 3,
    Low = 4,
}

impl Priority {
    /// HIGH and more urgent actions are awaited by the reconciliation
    pub fn is_synchronous(&self) -> bool {
        *self <= Priority::High
    }
}

/// Alert levels, least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Coarse urgency derived from one alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Ok,
    Warning,
    High,
    Critical,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
            Severity::Medium => "MEDIUM",
        }
    }

    /// Whether the alarm is active at all
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Severity::None | Severity::Ok)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decided corrective operation plus its execution outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub priority: Priority,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_nodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optimizations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_level: Option<AlertLevel>,
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RemediationAction {
    pub fn new(
        action_type: ActionType,
        priority: Priority,
        rule_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            priority,
            reason: reason.into(),
            target_nodes: None,
            optimizations: Vec::new(),
            alert_level: None,
            rule_name: rule_name.into(),
            scheduled_time: None,
            executed: false,
            executed_at: None,
            success: false,
            error_message: None,
        }
    }

    pub fn with_target_nodes(mut self, target: u32) -> Self {
        self.target_nodes = Some(target);
        self
    }

    pub fn with_optimizations<I, S>(mut self, optimizations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optimizations = optimizations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alert_level(mut self, level: AlertLevel) -> Self {
        self.alert_level = Some(level);
        self
    }

    pub fn mark_succeeded(&mut self, at: DateTime<Utc>) {
        self.executed = true;
        self.executed_at = Some(at);
        self.success = true;
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, at: DateTime<Utc>, message: impl Into<String>) {
        self.executed = true;
        self.executed_at = Some(at);
        self.success = false;
        self.error_message = Some(message.into());
    }
}

/// Explicit provisioning request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    pub cluster_name: String,
    #[serde(default = "default_cluster_type")]
    pub cluster_type: String,
    pub node_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
}

fn default_cluster_type() -> String {
    "opensearch".to_string()
}

impl ClusterRequest {
    pub fn validate(&self) -> RemediationResult<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(RemediationError::InvalidSpec(
                "clusterName must not be empty".to_string(),
            ));
        }
        if self.node_count == 0 {
            return Err(RemediationError::InvalidSpec(format!(
                "{}: nodeCount must be greater than 0",
                self.cluster_name
            )));
        }
        match self.cluster_type.to_ascii_lowercase().as_str() {
            "opensearch" | "elasticsearch" => Ok(()),
            other => Err(RemediationError::InvalidSpec(format!(
                "{}: unsupported cluster type {}",
                self.cluster_name, other
            ))),
        }
    }

    /// Requested version, or the default for the cluster type
    pub fn resolved_version(&self) -> String {
        match &self.version {
            Some(version) if !version.trim().is_empty() => version.clone(),
            _ if self.cluster_type.eq_ignore_ascii_case("elasticsearch") => "8.11.0".to_string(),
            _ => "2.11".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ClusterRecord {
        ClusterRecord::with_defaults("search-a", DEFAULT_NAMESPACE, Utc::now())
    }

    #[test]
    fn test_default_record_shape() {
        let record = record();
        assert_eq!(record.spec.node_count, 3);
        assert_eq!(record.status.node_count, 3);
        assert_eq!(record.status.phase, Phase::Ready);
        assert_eq!(record.spec.version, "OpenSearch_2.11");
        assert_eq!(record.min_nodes(), 2);
        assert_eq!(record.max_nodes(), 10);
        assert_eq!(record.key(), "default/search-a");
        assert!(record.spec.validate().is_ok());
    }

    #[test]
    fn test_can_scale_requires_ready_and_headroom() {
        let mut record = record();
        assert!(record.can_scale());
        assert!(record.can_scale_in());

        record.status.phase = Phase::Scaling;
        assert!(!record.can_scale());
        assert!(!record.can_scale_in());

        record.status.phase = Phase::Ready;
        record.spec.node_count = 10;
        assert!(!record.can_scale());

        record.spec.node_count = 2;
        assert!(!record.can_scale_in());

        record.spec.auto_scaling.enabled = false;
        record.spec.node_count = 5;
        assert!(!record.can_scale());
    }

    #[test]
    fn test_spec_validation_rejects_out_of_bounds() {
        let mut spec = record().spec;
        spec.node_count = 12;
        assert!(matches!(spec.validate(), Err(RemediationError::InvalidSpec(_))));

        spec.node_count = 3;
        spec.auto_scaling.min_nodes = 0;
        assert!(spec.validate().is_err());

        spec.thresholds = None;
        assert!(matches!(
            spec.require_thresholds(),
            Err(RemediationError::MissingThresholds(_))
        ));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Immediate < Priority::Critical);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::High.is_synchronous());
        assert!(!Priority::Medium.is_synchronous());
        assert!(!Priority::Low.is_synchronous());
    }

    #[test]
    fn test_action_type_parsing() {
        assert_eq!("scale_out".parse::<ActionType>().unwrap(), ActionType::ScaleOut);
        assert_eq!("ALERT-CRITICAL".parse::<ActionType>().unwrap(), ActionType::AlertCritical);
        assert!("reboot".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_alarm_event_wire_format() {
        let json = r#"{
            "clusterName": "search-a",
            "timestamp": "2024-05-01T10:00:00Z",
            "alarmName": "cpu-high",
            "state": "ALARM",
            "comparisonOperator": "GreaterThanThreshold",
            "threshold": 80.0,
            "value": 93.5,
            "reason": "Threshold crossed"
        }"#;
        let event: AlarmEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.state, AlarmState::Alarm);
        assert!(event.metrics.is_none());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_alarm_event_validation() {
        let event = AlarmEvent {
            cluster_name: " ".to_string(),
            namespace: None,
            timestamp: Utc::now(),
            alarm_name: "cpu-high".to_string(),
            state: AlarmState::Alarm,
            comparison_operator: String::new(),
            threshold: 80.0,
            value: 90.0,
            reason: String::new(),
            metrics: None,
        };
        assert!(matches!(event.validate(), Err(RemediationError::InvalidEvent(_))));
    }

    #[test]
    fn test_cluster_request_defaults() {
        let request: ClusterRequest =
            serde_json::from_str(r#"{"clusterName":"logs","nodeCount":2}"#).unwrap();
        assert_eq!(request.cluster_type, "opensearch");
        assert_eq!(request.resolved_version(), "2.11");
        assert!(request.validate().is_ok());

        let request = ClusterRequest {
            cluster_type: "elasticsearch".to_string(),
            ..request
        };
        assert_eq!(request.resolved_version(), "8.11.0");

        let request = ClusterRequest {
            cluster_type: "solr".to_string(),
            ..request
        };
        assert!(request.validate().is_err());
    }
}
