//! Executor tests against the in-memory collaborators

use super::*;
use crate::alert::AlertDispatcher;
use crate::clock::ManualClock;
use crate::control_plane::{Operation, SimulatedControlPlane};
use crate::models::{Priority, DEFAULT_NAMESPACE};
use crate::store::InMemoryClusterStore;

struct Fixture {
    store: Arc<InMemoryClusterStore>,
    control_plane: Arc<SimulatedControlPlane>,
    alerts: Arc<AlertDispatcher>,
    executor: ActionExecutor,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryClusterStore::new());
    let control_plane = Arc::new(SimulatedControlPlane::new());
    let alerts = Arc::new(AlertDispatcher::default());
    let clock = Arc::new(ManualClock::default());
    control_plane.register("search-a", 3);
    let executor = ActionExecutor::new(
        store.clone(),
        control_plane.clone(),
        alerts.clone(),
        clock,
    );
    Fixture {
        store,
        control_plane,
        alerts,
        executor,
    }
}

fn record() -> ClusterRecord {
    ClusterRecord::with_defaults("search-a", DEFAULT_NAMESPACE, Utc::now())
}

fn scale_out(target: u32) -> RemediationAction {
    RemediationAction::new(
        ActionType::ScaleOut,
        Priority::High,
        "cpu-alarm-scale-out",
        "cpu alarm cpu-high",
    )
    .with_target_nodes(target)
}

#[tokio::test]
async fn test_scale_out_success_updates_spec_and_status() {
    let f = fixture();
    let mut record = record();

    let prepared = f.executor.prepare(&mut record, &scale_out(4)).unwrap();
    assert_eq!(record.status.phase, Phase::Scaling);

    let outcome = f.executor.perform(&prepared).await;
    assert!(outcome.success);

    let action = f.executor.complete(&mut record, &prepared, &outcome);
    assert!(action.executed && action.success);
    assert_eq!(record.status.phase, Phase::Ready);
    assert_eq!(record.spec.node_count, 4);
    assert_eq!(record.status.node_count, 4);
    assert_eq!(f.control_plane.node_count("search-a"), Some(4));

    let last = record.status.last_action.expect("last action");
    assert_eq!(last.action_type, ActionType::ScaleOut);
    assert!(last.success);
}

#[tokio::test]
async fn test_scale_failure_moves_to_error() {
    let f = fixture();
    f.control_plane.fail(Operation::Scale);
    let mut record = record();

    let action = f.executor.execute(&mut record, &scale_out(4)).await.unwrap();
    assert!(action.executed);
    assert!(!action.success);
    assert!(action.error_message.is_some());
    assert_eq!(record.status.phase, Phase::Error);
    assert_eq!(record.spec.node_count, 3);
}

#[tokio::test]
async fn test_scale_clamps_and_noops_at_bound() {
    let f = fixture();
    let mut record = record();
    record.spec.node_count = 10;
    record.status.node_count = 10;

    let prepared = f.executor.prepare(&mut record, &scale_out(11)).unwrap();
    assert!(matches!(prepared.step, Step::Noop { .. }));
    assert_eq!(record.status.phase, Phase::Ready);

    let action = f.executor.execute(&mut record, &scale_out(11)).await.unwrap();
    assert!(action.success);
    assert_eq!(f.control_plane.call_count(Operation::Scale), 0);
}

#[tokio::test]
async fn test_scale_in_clamps_to_minimum() {
    let f = fixture();
    let mut record = record();
    let action = RemediationAction::new(ActionType::ScaleIn, Priority::Low, "cpu-scale-in", "idle")
        .with_target_nodes(1);

    let prepared = f.executor.prepare(&mut record, &action).unwrap();
    assert_eq!(
        prepared.step,
        Step::Scale {
            target: 2,
            emergency: false
        }
    );
}

#[tokio::test]
async fn test_emergency_scale_sends_critical_alert() {
    let f = fixture();
    let mut record = record();
    let action = RemediationAction::new(
        ActionType::EmergencyScale,
        Priority::Immediate,
        "emergency-scale",
        "cpu critical",
    )
    .with_target_nodes(6);

    let executed = f.executor.execute(&mut record, &action).await.unwrap();
    assert!(executed.success);
    assert_eq!(record.spec.node_count, 6);

    let alerts = f.alerts.recent().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Critical);
    assert_eq!(alerts[0].message, "EMERGENCY: Scaled cluster search-a to 6 nodes");
}

#[tokio::test]
async fn test_scaling_requires_ready_phase() {
    let f = fixture();
    let mut record = record();
    record.status.phase = Phase::Scaling;

    let err = f.executor.prepare(&mut record, &scale_out(4)).unwrap_err();
    assert!(matches!(
        err,
        crate::error::RemediationError::InvalidTransition { .. }
    ));
}

#[tokio::test]
async fn test_create_new_cluster_leaves_origin_untouched() {
    let f = fixture();
    let mut record = record();
    record.spec.node_count = 5;
    record.status.node_count = 5;
    let before = record.spec.clone();

    let action = RemediationAction::new(
        ActionType::CreateNewCluster,
        Priority::Critical,
        "critical-latency-alarm-new-cluster",
        "latency critical",
    );
    let executed = f.executor.execute(&mut record, &action).await.unwrap();
    assert!(executed.success);
    assert_eq!(record.spec, before);
    assert_eq!(record.status.phase, Phase::Ready);

    let replicas: Vec<ClusterRecord> = f
        .store
        .list(None)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.name().starts_with("search-a-replica-"))
        .collect();
    assert_eq!(replicas.len(), 1);
    assert_eq!(replicas[0].spec.node_count, 3);
    assert_eq!(replicas[0].status.phase, Phase::Creating);
    assert!(replicas[0].spec.validate().is_ok());

    let alerts = f.alerts.recent().await;
    assert_eq!(alerts[0].level, AlertLevel::Warning);
    assert!(alerts[0].message.starts_with("Created new OpenSearch cluster: search-a-replica-"));
}

#[tokio::test]
async fn test_create_failure_marks_replica_errored() {
    let f = fixture();
    f.control_plane.fail(Operation::Create);
    let mut record = record();
    let action = RemediationAction::new(
        ActionType::CreateNewCluster,
        Priority::Critical,
        "critical-backup-cluster",
        "critical health",
    );

    let executed = f.executor.execute(&mut record, &action).await.unwrap();
    assert!(!executed.success);

    let replicas = f.store.list(None).await.unwrap();
    assert_eq!(replicas.len(), 1);
    assert_eq!(replicas[0].status.phase, Phase::Error);
}

#[tokio::test]
async fn test_alert_uses_action_level() {
    let f = fixture();
    let mut record = record();
    let action = RemediationAction::new(
        ActionType::AlertCritical,
        Priority::Critical,
        "disk-space-alert",
        "disk alarm disk-full",
    );

    let executed = f.executor.execute(&mut record, &action).await.unwrap();
    assert!(executed.success);
    assert_eq!(record.status.phase, Phase::Ready);

    let alerts = f.alerts.recent().await;
    assert_eq!(alerts[0].level, AlertLevel::Critical);
    assert_eq!(
        alerts[0].message,
        "Search cluster alert: search-a - disk alarm disk-full"
    );
}

#[tokio::test]
async fn test_optimize_does_not_touch_phase() {
    let f = fixture();
    let mut record = record();
    let action = RemediationAction::new(
        ActionType::OptimizeCluster,
        Priority::Medium,
        "latency-alarm-optimization",
        "latency",
    );

    let prepared = f.executor.prepare(&mut record, &action).unwrap();
    match &prepared.step {
        Step::Optimize { optimizations } => assert_eq!(optimizations.len(), 3),
        other => panic!("unexpected step {:?}", other),
    }
    let outcome = f.executor.perform(&prepared).await;
    let executed = f.executor.complete(&mut record, &prepared, &outcome);
    assert!(executed.success);
    assert_eq!(record.spec.node_count, 3);
    assert_eq!(record.status.phase, Phase::Ready);
    assert_eq!(f.control_plane.call_count(Operation::Optimize), 1);
}
