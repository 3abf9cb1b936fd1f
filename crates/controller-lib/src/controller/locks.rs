//! Per-cluster serialization

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::cluster_key;

/// One async mutex per `namespace/name`
///
/// Guards are held only while a record is read and committed, never
/// across control-plane calls.
#[derive(Debug, Default)]
pub struct ClusterLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ClusterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, namespace: &str, name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(cluster_key(namespace, name))
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_cluster_is_serialized() {
        let locks = Arc::new(ClusterLocks::new());
        let guard = locks.acquire("default", "search-a").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("default", "search-a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_clusters_are_independent() {
        let locks = ClusterLocks::new();
        let _a = locks.acquire("default", "search-a").await;
        let _b = locks.acquire("default", "search-b").await;
        let _c = locks.acquire("staging", "search-a").await;
        assert_eq!(locks.len(), 3);
    }
}
