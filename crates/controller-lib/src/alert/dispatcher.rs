//! Logging alert channel with Alertmanager rendering

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::{AlertChannel, AlertNotification};
use crate::models::AlertLevel;

/// Default number of alerts kept in memory
const DEFAULT_HISTORY: usize = 100;

/// Alert name used for every remediation alert
const ALERT_NAME: &str = "SearchClusterRemediation";

/// Alertmanager webhook alert format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerAlert {
    /// Alert status (firing or resolved)
    pub status: String,
    /// Labels for routing and grouping
    pub labels: HashMap<String, String>,
    /// Human-readable details
    pub annotations: HashMap<String, String>,
    /// Start time in RFC3339 format
    pub starts_at: String,
}

/// Alertmanager webhook payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertmanagerPayload {
    pub alerts: Vec<AlertmanagerAlert>,
}

/// Alert channel that logs each alert and keeps a bounded history
pub struct AlertDispatcher {
    history: RwLock<VecDeque<AlertNotification>>,
    capacity: usize,
    component: String,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl AlertDispatcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            component: "search-remediator".to_string(),
        }
    }

    /// Most recent alerts, newest last
    pub async fn recent(&self) -> Vec<AlertNotification> {
        self.history.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.history.read().await.len()
    }

    /// Render the history as an Alertmanager webhook payload
    pub async fn to_alertmanager_payload(&self) -> AlertmanagerPayload {
        let alerts = self
            .history
            .read()
            .await
            .iter()
            .map(|n| self.format_alertmanager(n))
            .collect();
        AlertmanagerPayload { alerts }
    }

    fn format_alertmanager(&self, notification: &AlertNotification) -> AlertmanagerAlert {
        let mut labels = HashMap::new();
        labels.insert("alertname".to_string(), ALERT_NAME.to_string());
        labels.insert("severity".to_string(), notification.level.to_string());
        labels.insert("cluster".to_string(), notification.cluster.clone());
        labels.insert("component".to_string(), self.component.clone());

        let mut annotations = HashMap::new();
        annotations.insert("summary".to_string(), notification.message.clone());

        AlertmanagerAlert {
            status: "firing".to_string(),
            labels,
            annotations,
            starts_at: notification.timestamp.to_rfc3339(),
        }
    }
}

#[async_trait]
impl AlertChannel for AlertDispatcher {
    async fn send(&self, notification: AlertNotification) {
        match notification.level {
            AlertLevel::Critical | AlertLevel::Error => error!(
                event = "alert_sent",
                cluster = %notification.cluster,
                level = %notification.level,
                "{}", notification.message
            ),
            AlertLevel::Warning => warn!(
                event = "alert_sent",
                cluster = %notification.cluster,
                level = %notification.level,
                "{}", notification.message
            ),
            AlertLevel::Info => info!(
                event = "alert_sent",
                cluster = %notification.cluster,
                level = %notification.level,
                "{}", notification.message
            ),
        }

        let mut history = self.history.write().await;
        if history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(notification);
    }
}
