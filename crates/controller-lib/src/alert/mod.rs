//! Alert dispatch for remediation outcomes
//!
//! Handles:
//! - The fire-and-forget alert channel used by the executor
//! - Level-matched log output for each alert
//! - Bounded alert history rendered as an Alertmanager webhook payload

mod dispatcher;

pub use dispatcher::{AlertDispatcher, AlertmanagerAlert, AlertmanagerPayload};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AlertLevel;

/// One alert raised by the control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotification {
    pub cluster: String,
    pub message: String,
    pub level: AlertLevel,
    pub timestamp: DateTime<Utc>,
}

impl AlertNotification {
    pub fn new(
        cluster: impl Into<String>,
        message: impl Into<String>,
        level: AlertLevel,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            message: message.into(),
            level,
            timestamp,
        }
    }
}

/// Outbound alert channel; delivery problems are the channel's own concern
#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn send(&self, notification: AlertNotification);
}
