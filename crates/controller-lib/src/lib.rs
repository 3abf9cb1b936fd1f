//! Remediation library for managed search clusters
//!
//! This crate provides the core of the remediation control loop:
//! - Alarm severity classification
//! - Decision policies (alarm rules, health score, custom rules)
//! - Cooldown and cluster-state gating
//! - Action execution against the control plane
//! - Delayed retries of deferred actions
//! - Health checks and observability

pub mod alert;
pub mod classifier;
pub mod clock;
pub mod control_plane;
pub mod controller;
pub mod decision;
pub mod error;
pub mod executor;
pub mod gate;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod scheduler;
pub mod store;

pub use controller::{
    ActionOutcome, Controller, ControllerBuilder, ControllerConfig, ExecutionStatus,
    ReconcileReport,
};
pub use error::{RemediationError, RemediationResult, StoreError};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{ControllerMetrics, StructuredLogger};
