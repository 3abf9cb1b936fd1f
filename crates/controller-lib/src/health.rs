//! Controller health and readiness
//!
//! Each collaborator of the control loop reports into a [`HealthRegistry`].
//! The controller is ready to take alarms once initialized and while every
//! readiness-gating component is at least degraded. A failing control plane
//! only degrades health: failed actions are recorded on the cluster and a
//! later alarm retries them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Parts of the controller that report health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Controller,
    ClusterStore,
    ControlPlane,
    RetryScheduler,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Controller,
        Component::ClusterStore,
        Component::ControlPlane,
        Component::RetryScheduler,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Controller => "controller",
            Component::ClusterStore => "cluster_store",
            Component::ControlPlane => "control_plane",
            Component::RetryScheduler => "retry_scheduler",
        }
    }

    /// An unhealthy component of this kind makes the controller unready
    pub fn gates_readiness(self) -> bool {
        !matches!(self, Component::ControlPlane)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still usable, e.g. control-plane calls failing
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the component entered its current status
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    initialized: bool,
    components: BTreeMap<Component, ComponentHealth>,
}

/// Shared view of component health, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register any missing component as healthy and start accepting alarms
    pub async fn mark_initialized(&self) {
        let mut state = self.state.write().await;
        let now = Utc::now();
        for component in Component::ALL {
            state.components.entry(component).or_insert(ComponentHealth {
                status: ComponentStatus::Healthy,
                message: None,
                since: now,
            });
        }
        state.initialized = true;
    }

    pub async fn mark_shutting_down(&self) {
        self.report(
            Component::Controller,
            ComponentStatus::Unhealthy,
            Some("shutting down".to_string()),
        )
        .await;
        self.state.write().await.initialized = false;
    }

    pub async fn set_healthy(&self, component: Component) {
        self.report(component, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.report(component, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.report(component, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    async fn report(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let entry = state.components.entry(component).or_insert(ComponentHealth {
            status,
            message: None,
            since: now,
        });
        if entry.status != status {
            entry.status = status;
            entry.since = now;
        }
        entry.message = message;
    }

    pub async fn component(&self, component: Component) -> Option<ComponentHealth> {
        self.state.read().await.components.get(&component).cloned()
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let status = state
            .components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse {
            status,
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        if !state.initialized {
            return ReadinessResponse {
                ready: false,
                reason: Some("controller not initialized".to_string()),
            };
        }

        let blocking = state
            .components
            .iter()
            .find(|(c, h)| c.gates_readiness() && !h.status.is_operational());
        match blocking {
            Some((component, health)) => ReadinessResponse {
                ready: false,
                reason: Some(match &health.message {
                    Some(message) => format!("{} unhealthy: {}", component, message),
                    None => format!("{} unhealthy", component),
                }),
            },
            None => ReadinessResponse {
                ready: true,
                reason: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unready_until_initialized() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("controller not initialized"));

        registry.mark_initialized().await;
        assert!(registry.readiness().await.ready);
        assert_eq!(registry.health().await.components.len(), 4);
    }

    #[tokio::test]
    async fn test_store_outage_blocks_readiness() {
        let registry = HealthRegistry::new();
        registry.mark_initialized().await;
        registry
            .set_unhealthy(Component::ClusterStore, "connection refused")
            .await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("cluster_store unhealthy: connection refused")
        );
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);

        registry.set_healthy(Component::ClusterStore).await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_control_plane_failure_keeps_controller_ready() {
        let registry = HealthRegistry::new();
        registry.mark_initialized().await;
        registry
            .set_degraded(Component::ControlPlane, "scale call failed")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .set_unhealthy(Component::ControlPlane, "endpoint gone")
            .await;
        assert!(registry.readiness().await.ready);
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_since_moves_only_on_status_change() {
        let registry = HealthRegistry::new();
        registry.set_degraded(Component::ControlPlane, "first").await;
        let first = registry.component(Component::ControlPlane).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.set_degraded(Component::ControlPlane, "second").await;
        let second = registry.component(Component::ControlPlane).await.unwrap();
        assert_eq!(second.since, first.since);
        assert_eq!(second.message.as_deref(), Some("second"));

        registry.set_healthy(Component::ControlPlane).await;
        let healed = registry.component(Component::ControlPlane).await.unwrap();
        assert!(healed.since > first.since);
        assert!(healed.message.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_makes_controller_unready() {
        let registry = HealthRegistry::new();
        registry.mark_initialized().await;
        registry.mark_shutting_down().await;

        assert!(!registry.readiness().await.ready);
        let controller = registry.component(Component::Controller).await.unwrap();
        assert_eq!(controller.status, ComponentStatus::Unhealthy);
    }

    #[test]
    fn test_components_serialize_as_snake_case_keys() {
        let mut components = BTreeMap::new();
        components.insert(
            Component::RetryScheduler,
            ComponentHealth {
                status: ComponentStatus::Healthy,
                message: None,
                since: Utc::now(),
            },
        );
        let json = serde_json::to_value(HealthResponse {
            status: ComponentStatus::Healthy,
            components,
        })
        .unwrap();
        assert_eq!(json["components"]["retry_scheduler"]["status"], "healthy");
        assert_eq!(json["status"], "healthy");
    }
}
