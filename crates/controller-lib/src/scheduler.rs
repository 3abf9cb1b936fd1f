//! Delayed retry scheduler
//!
//! Deferred actions wait out their remaining cooldown on a spawned timer
//! task and are then delivered on an mpsc channel to the controller, which
//! re-checks relevance under the cluster lock before executing.
//!
//! At most one entry per `(cluster, rule)` is pending. Each entry carries a
//! generation id; a delivery whose generation no longer matches the table
//! (cancelled, or replaced after a cancel) is stale and must be dropped.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{cluster_key, RemediationAction, Severity};

/// Action waiting for its cooldown to elapse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredAction {
    pub namespace: String,
    pub cluster: String,
    pub action: RemediationAction,
    pub severity: Severity,
    pub due_at: DateTime<Utc>,
    pub generation: u64,
}

impl DeferredAction {
    pub fn new(
        namespace: impl Into<String>,
        cluster: impl Into<String>,
        action: RemediationAction,
        severity: Severity,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            cluster: cluster.into(),
            action,
            severity,
            due_at,
            generation: 0,
        }
    }

    fn key(&self) -> (String, String) {
        (
            cluster_key(&self.namespace, &self.cluster),
            self.action.rule_name.clone(),
        )
    }
}

/// Result of [`RetryScheduler::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled { generation: u64 },
    /// An entry for the same (cluster, rule) is already pending
    Coalesced,
}

/// Timer-driven queue of deferred actions
pub struct RetryScheduler {
    pending: DashMap<(String, String), DeferredAction>,
    next_generation: AtomicU64,
    tx: mpsc::Sender<DeferredAction>,
}

impl RetryScheduler {
    /// Scheduler plus the receiving end consumed by the controller
    pub fn new(queue_size: usize) -> (Self, mpsc::Receiver<DeferredAction>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        let scheduler = Self {
            pending: DashMap::new(),
            next_generation: AtomicU64::new(1),
            tx,
        };
        (scheduler, rx)
    }

    /// Deliver `deferred` after `delay`, unless the pair is already pending
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, mut deferred: DeferredAction, delay: Duration) -> ScheduleOutcome {
        let generation = match self.pending.entry(deferred.key()) {
            Entry::Occupied(_) => return ScheduleOutcome::Coalesced,
            Entry::Vacant(slot) => {
                let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
                deferred.generation = generation;
                slot.insert(deferred.clone());
                generation
            }
        };

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let cluster = deferred.cluster.clone();
            if tx.send(deferred).await.is_err() {
                debug!(cluster = %cluster, generation, "Deferred queue closed, entry discarded");
            }
        });

        ScheduleOutcome::Scheduled { generation }
    }

    /// Claim a delivered entry; `false` when it is stale
    pub fn take(&self, deferred: &DeferredAction) -> bool {
        self.pending
            .remove_if(&deferred.key(), |_, current| {
                current.generation == deferred.generation
            })
            .is_some()
    }

    /// Forget every pending entry of a cluster; returns how many were dropped
    pub fn cancel_cluster(&self, namespace: &str, cluster: &str) -> usize {
        let key = cluster_key(namespace, cluster);
        let before = self.pending.len();
        self.pending.retain(|(pending_key, _), _| *pending_key != key);
        before.saturating_sub(self.pending.len())
    }

    pub fn is_pending(&self, namespace: &str, cluster: &str, rule: &str) -> bool {
        self.pending
            .contains_key(&(cluster_key(namespace, cluster), rule.to_string()))
    }

    /// Snapshot of pending entries, soonest first
    pub fn pending(&self) -> Vec<DeferredAction> {
        let mut entries: Vec<DeferredAction> =
            self.pending.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.due_at);
        entries
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, Priority};

    fn deferred(cluster: &str, rule: &str) -> DeferredAction {
        let action = RemediationAction::new(ActionType::ScaleOut, Priority::High, rule, "cpu");
        DeferredAction::new("default", cluster, action, Severity::Medium, Utc::now())
    }

    #[tokio::test]
    async fn test_schedule_delivers_after_delay() {
        let (scheduler, mut rx) = RetryScheduler::new(8);
        let outcome = scheduler.schedule(
            deferred("search-a", "cpu-alarm-scale-out"),
            Duration::from_millis(20),
        );
        assert!(matches!(outcome, ScheduleOutcome::Scheduled { .. }));
        assert_eq!(scheduler.pending_count(), 1);

        let delivered = rx.recv().await.expect("delivery");
        assert_eq!(delivered.cluster, "search-a");
        assert!(scheduler.take(&delivered));
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!scheduler.take(&delivered));
    }

    #[tokio::test]
    async fn test_duplicate_pair_is_coalesced() {
        let (scheduler, _rx) = RetryScheduler::new(8);
        let delay = Duration::from_secs(60);
        assert!(matches!(
            scheduler.schedule(deferred("search-a", "cpu-alarm-scale-out"), delay),
            ScheduleOutcome::Scheduled { .. }
        ));
        assert_eq!(
            scheduler.schedule(deferred("search-a", "cpu-alarm-scale-out"), delay),
            ScheduleOutcome::Coalesced
        );
        assert!(matches!(
            scheduler.schedule(deferred("search-a", "latency-alarm-scale-out"), delay),
            ScheduleOutcome::Scheduled { .. }
        ));
        assert_eq!(scheduler.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_entries_are_stale() {
        let (scheduler, mut rx) = RetryScheduler::new(8);
        scheduler.schedule(
            deferred("search-a", "cpu-alarm-scale-out"),
            Duration::from_millis(10),
        );
        scheduler.schedule(deferred("search-b", "cpu-alarm-scale-out"), Duration::from_secs(60));

        assert_eq!(scheduler.cancel_cluster("default", "search-a"), 1);
        assert!(scheduler.is_pending("default", "search-b", "cpu-alarm-scale-out"));

        let delivered = rx.recv().await.expect("delivery");
        assert_eq!(delivered.cluster, "search-a");
        assert!(!scheduler.take(&delivered));
    }
}
