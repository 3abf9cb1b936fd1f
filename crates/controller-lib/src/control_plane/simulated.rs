//! Simulated control plane
//!
//! Keeps a table of known clusters, supports per-operation failure
//! injection and an optional artificial latency for every call.

use anyhow::{bail, Result};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{ControlPlane, ControlPlaneStatus};
use crate::models::ClusterSpec;

/// Control-plane operations, for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Scale,
    Create,
    Delete,
    Optimize,
    Status,
}

#[derive(Debug, Clone)]
struct SimulatedCluster {
    node_count: u32,
    status: ControlPlaneStatus,
}

/// In-process control plane
#[derive(Debug, Default)]
pub struct SimulatedControlPlane {
    clusters: DashMap<String, SimulatedCluster>,
    failing: DashSet<Operation>,
    calls: DashMap<Operation, usize>,
    latency: Duration,
}

impl SimulatedControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seed an existing, healthy cluster
    pub fn register(&self, cluster_name: &str, node_count: u32) {
        self.clusters.insert(
            cluster_name.to_string(),
            SimulatedCluster {
                node_count,
                status: ControlPlaneStatus::Active,
            },
        );
    }

    /// Make `operation` fail until [`SimulatedControlPlane::recover`]
    pub fn fail(&self, operation: Operation) {
        self.failing.insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.failing.remove(&operation);
    }

    /// Force the reported status of a known cluster
    pub fn set_status(&self, cluster_name: &str, status: ControlPlaneStatus) {
        if let Some(mut cluster) = self.clusters.get_mut(cluster_name) {
            cluster.status = status;
        }
    }

    pub fn node_count(&self, cluster_name: &str) -> Option<u32> {
        self.clusters.get(cluster_name).map(|c| c.node_count)
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls.get(&operation).map(|c| *c).unwrap_or(0)
    }

    async fn begin(&self, operation: Operation, cluster_name: &str) -> Result<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.contains(&operation) {
            bail!("simulated {:?} failure for cluster {}", operation, cluster_name);
        }
        debug!(operation = ?operation, cluster = %cluster_name, "Simulated control-plane call");
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for SimulatedControlPlane {
    async fn scale(&self, cluster_name: &str, target_nodes: u32) -> Result<bool> {
        self.begin(Operation::Scale, cluster_name).await?;
        self.clusters
            .entry(cluster_name.to_string())
            .and_modify(|c| {
                c.node_count = target_nodes;
                c.status = ControlPlaneStatus::Active;
            })
            .or_insert(SimulatedCluster {
                node_count: target_nodes,
                status: ControlPlaneStatus::Active,
            });
        info!(cluster = %cluster_name, target_nodes, "Simulated scale applied");
        Ok(true)
    }

    async fn create(&self, spec: &ClusterSpec) -> Result<bool> {
        self.begin(Operation::Create, &spec.cluster_name).await?;
        if self.clusters.contains_key(&spec.cluster_name) {
            return Ok(false);
        }
        self.register(&spec.cluster_name, spec.node_count);
        info!(cluster = %spec.cluster_name, nodes = spec.node_count, "Simulated cluster created");
        Ok(true)
    }

    async fn delete(&self, cluster_name: &str) -> Result<bool> {
        self.begin(Operation::Delete, cluster_name).await?;
        Ok(self.clusters.remove(cluster_name).is_some())
    }

    async fn optimize(&self, cluster_name: &str, optimizations: &[String]) -> Result<bool> {
        self.begin(Operation::Optimize, cluster_name).await?;
        info!(
            cluster = %cluster_name,
            optimizations = ?optimizations,
            "Simulated optimizations applied"
        );
        Ok(true)
    }

    async fn status(&self, cluster_name: &str) -> Result<ControlPlaneStatus> {
        self.begin(Operation::Status, cluster_name).await?;
        Ok(self
            .clusters
            .get(cluster_name)
            .map(|c| c.status)
            .unwrap_or(ControlPlaneStatus::NotFound))
    }
}
