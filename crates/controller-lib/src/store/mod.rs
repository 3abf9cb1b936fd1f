//! Cluster-state store boundary
//!
//! The store owns cluster records keyed by `(namespace, name)`. The
//! controller reads a record at the start of a reconciliation and writes it
//! back at the end; nothing is cached between reconciliations.

mod memory;

pub use memory::InMemoryClusterStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{ClusterRecord, ClusterStatus};

/// CRUD over cluster records
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch a record, `None` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ClusterRecord>, StoreError>;

    /// Insert or replace a whole record
    async fn create_or_update(&self, record: &ClusterRecord) -> Result<ClusterRecord, StoreError>;

    /// Replace only the status of an existing record
    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ClusterStatus,
    ) -> Result<ClusterRecord, StoreError>;

    /// Remove a record; returns whether it existed
    async fn delete(&self, namespace: &str, name: &str) -> Result<bool, StoreError>;

    /// Records in one namespace, or all of them
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ClusterRecord>, StoreError>;
}
