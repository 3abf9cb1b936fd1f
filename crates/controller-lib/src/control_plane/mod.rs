//! Cluster control-plane boundary
//!
//! The control plane physically resizes, creates, tunes and deletes search
//! clusters. Calls may take seconds to minutes; timeouts are the
//! implementation's concern. `Ok(false)` and `Err` are both failures.

mod simulated;

pub use simulated::{Operation, SimulatedControlPlane};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ClusterSpec;

/// Cluster state as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlPlaneStatus {
    Active,
    Processing,
    Error,
    NotFound,
    Deleted,
}

/// Physical operations on search clusters
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn scale(&self, cluster_name: &str, target_nodes: u32) -> Result<bool>;

    async fn create(&self, spec: &ClusterSpec) -> Result<bool>;

    async fn delete(&self, cluster_name: &str) -> Result<bool>;

    async fn optimize(&self, cluster_name: &str, optimizations: &[String]) -> Result<bool>;

    async fn status(&self, cluster_name: &str) -> Result<ControlPlaneStatus>;
}
