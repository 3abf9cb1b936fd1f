//! DashMap-backed cluster store

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::ClusterStore;
use crate::error::StoreError;
use crate::models::{cluster_key, ClusterRecord, ClusterStatus};

/// In-process cluster store
#[derive(Debug, Default)]
pub struct InMemoryClusterStore {
    records: DashMap<String, ClusterRecord>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a backend error until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ClusterRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .records
            .get(&cluster_key(namespace, name))
            .map(|r| r.value().clone()))
    }

    async fn create_or_update(&self, record: &ClusterRecord) -> Result<ClusterRecord, StoreError> {
        self.check_available()?;
        self.records.insert(record.key(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ClusterStatus,
    ) -> Result<ClusterRecord, StoreError> {
        self.check_available()?;
        let key = cluster_key(namespace, name);
        let mut record = self
            .records
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        record.status = status.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.records.remove(&cluster_key(namespace, name)).is_some())
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ClusterRecord>, StoreError> {
        self.check_available()?;
        let mut records: Vec<ClusterRecord> = self
            .records
            .iter()
            .filter(|r| namespace.map_or(true, |ns| r.namespace() == ns))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;
    use chrono::Utc;

    #[tokio::test]
    async fn test_crud_round() {
        let store = InMemoryClusterStore::new();
        assert!(store.get("default", "search-a").await.unwrap().is_none());

        let record = ClusterRecord::with_defaults("search-a", "default", Utc::now());
        store.create_or_update(&record).await.unwrap();
        assert_eq!(store.get("default", "search-a").await.unwrap(), Some(record.clone()));

        let mut status = record.status.clone();
        status.phase = Phase::Scaling;
        let updated = store.update_status("default", "search-a", &status).await.unwrap();
        assert_eq!(updated.status.phase, Phase::Scaling);
        assert_eq!(updated.spec, record.spec);

        assert!(store.delete("default", "search-a").await.unwrap());
        assert!(!store.delete("default", "search-a").await.unwrap());
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_update_status_requires_record() {
        let store = InMemoryClusterStore::new();
        let record = ClusterRecord::with_defaults("ghost", "default", Utc::now());
        let err = store
            .update_status("default", "ghost", &record.status)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_namespace() {
        let store = InMemoryClusterStore::new();
        let now = Utc::now();
        for (name, ns) in [("b", "prod"), ("a", "prod"), ("c", "staging")] {
            store
                .create_or_update(&ClusterRecord::with_defaults(name, ns, now))
                .await
                .unwrap();
        }
        let prod: Vec<String> = store
            .list(Some("prod"))
            .await
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(prod, vec!["a", "b"]);
        assert_eq!(store.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = InMemoryClusterStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.list(None).await,
            Err(StoreError::Backend(_))
        ));
        store.set_unavailable(false);
        assert!(store.list(None).await.is_ok());
    }
}
