//! Daemon configuration

use anyhow::{bail, Context, Result};
use controller_lib::controller::ControllerConfig;
use controller_lib::decision::{AlarmRuleEngine, HealthScoreStrategy, RemediationPolicy};
use controller_lib::gate::{CooldownBucket, CooldownPolicy};
use controller_lib::observability::StructuredLogger;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "REMEDIATOR_CONFIG";

/// Decision policy selected at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    AlarmRules,
    HealthScore,
}

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerSettings {
    /// Instance name reported in structured logs
    #[serde(default = "default_instance")]
    pub instance: String,

    /// API server port for the alarm inbox, admin and health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Namespace for alarms that do not name one
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub strategy: Strategy,

    /// Per-bucket cooldown overrides in seconds, keyed like `scale_out`
    #[serde(default)]
    pub cooldowns: HashMap<String, u64>,

    #[serde(default = "default_deferred_queue_size")]
    pub deferred_queue_size: usize,

    /// Fold control-plane status into the cluster phase before deciding
    #[serde(default = "default_phase_sync")]
    pub phase_sync: bool,

    /// Artificial latency of the simulated control plane
    #[serde(default)]
    pub simulated_latency_ms: u64,

    /// Number of recent alerts kept for `/api/v1/alerts`
    #[serde(default = "default_alert_history")]
    pub alert_history: usize,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "search-remediator".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_deferred_queue_size() -> usize {
    256
}

fn default_phase_sync() -> bool {
    true
}

fn default_alert_history() -> usize {
    100
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            api_port: default_api_port(),
            namespace: default_namespace(),
            strategy: Strategy::default(),
            cooldowns: HashMap::new(),
            deferred_queue_size: default_deferred_queue_size(),
            phase_sync: default_phase_sync(),
            simulated_latency_ms: 0,
            alert_history: default_alert_history(),
        }
    }
}

impl ControllerSettings {
    /// Load configuration from the optional file and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).ok();
        Self::load_from(file.as_deref().map(Path::new))
    }

    /// Load configuration, layering `REMEDIATOR_*` variables over `file`
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("REMEDIATOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        let settings: ControllerSettings = config
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            bail!("namespace must not be empty");
        }
        if self.deferred_queue_size == 0 {
            bail!("deferred_queue_size must be greater than 0");
        }
        self.cooldown_policy().map(|_| ())
    }

    /// Cooldown policy with the configured overrides applied
    pub fn cooldown_policy(&self) -> Result<CooldownPolicy> {
        self.cooldowns
            .iter()
            .try_fold(CooldownPolicy::new(), |policy, (key, secs)| {
                let Some(bucket) = CooldownBucket::from_key(key) else {
                    bail!("unknown cooldown bucket: {}", key);
                };
                Ok(policy.with_override(bucket, Duration::from_secs(*secs)))
            })
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            namespace: self.namespace.clone(),
            phase_sync: self.phase_sync,
            deferred_queue_size: self.deferred_queue_size,
        }
    }

    pub fn policy(&self, logger: &StructuredLogger) -> Arc<dyn RemediationPolicy> {
        let rules = AlarmRuleEngine::new(logger.clone());
        match self.strategy {
            Strategy::AlarmRules => Arc::new(rules),
            Strategy::HealthScore => Arc::new(HealthScoreStrategy::new(rules)),
        }
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}
