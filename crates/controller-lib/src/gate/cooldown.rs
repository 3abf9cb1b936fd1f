//! Cooldown buckets and durations
//!
//! A rule name maps to a bucket through an ordered pattern table over the
//! lower-cased name; the bucket decides how long the (cluster, rule) pair
//! stays in cooldown after a successful execution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Cooldown classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownBucket {
    ScaleOut,
    ScaleIn,
    EmergencyScale,
    CreateNewCluster,
    OptimizeCluster,
    Alert,
    AlertCritical,
    Default,
}

const BUCKET_PATTERNS: &[(&[&str], CooldownBucket)] = &[
    (&["scale-out", "scale_out"], CooldownBucket::ScaleOut),
    (&["scale-in", "scale_in"], CooldownBucket::ScaleIn),
    (&["emergency"], CooldownBucket::EmergencyScale),
    (&["new-cluster", "new_cluster"], CooldownBucket::CreateNewCluster),
    (&["optim"], CooldownBucket::OptimizeCluster),
    (&["critical"], CooldownBucket::AlertCritical),
    (&["alert"], CooldownBucket::Alert),
];

impl CooldownBucket {
    pub const ALL: [CooldownBucket; 8] = [
        CooldownBucket::ScaleOut,
        CooldownBucket::ScaleIn,
        CooldownBucket::EmergencyScale,
        CooldownBucket::CreateNewCluster,
        CooldownBucket::OptimizeCluster,
        CooldownBucket::Alert,
        CooldownBucket::AlertCritical,
        CooldownBucket::Default,
    ];

    /// Bucket for a rule name, first match wins
    pub fn for_rule(rule_name: &str) -> Self {
        let rule = rule_name.to_lowercase();
        BUCKET_PATTERNS
            .iter()
            .find(|(needles, _)| needles.iter().any(|needle| rule.contains(needle)))
            .map(|(_, bucket)| *bucket)
            .unwrap_or(CooldownBucket::Default)
    }

    /// Built-in cooldown for the bucket
    pub fn default_duration(self) -> Duration {
        let minutes = match self {
            CooldownBucket::ScaleOut => 10,
            CooldownBucket::ScaleIn => 30,
            CooldownBucket::EmergencyScale => 5,
            CooldownBucket::CreateNewCluster => 60,
            CooldownBucket::OptimizeCluster => 15,
            CooldownBucket::Alert => 5,
            CooldownBucket::AlertCritical => 2,
            CooldownBucket::Default => 10,
        };
        Duration::from_secs(minutes * 60)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CooldownBucket::ScaleOut => "scale_out",
            CooldownBucket::ScaleIn => "scale_in",
            CooldownBucket::EmergencyScale => "emergency_scale",
            CooldownBucket::CreateNewCluster => "create_new_cluster",
            CooldownBucket::OptimizeCluster => "optimize_cluster",
            CooldownBucket::Alert => "alert",
            CooldownBucket::AlertCritical => "alert_critical",
            CooldownBucket::Default => "default",
        }
    }

    /// Parse a configuration key such as `scale_out`
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|bucket| bucket.as_str() == key)
    }
}

impl fmt::Display for CooldownBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket durations with optional overrides
#[derive(Debug, Clone, Default)]
pub struct CooldownPolicy {
    overrides: HashMap<CooldownBucket, Duration>,
}

impl CooldownPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override one bucket's duration
    pub fn with_override(mut self, bucket: CooldownBucket, duration: Duration) -> Self {
        self.overrides.insert(bucket, duration);
        self
    }

    /// Same duration for every bucket
    pub fn uniform(duration: Duration) -> Self {
        CooldownBucket::ALL
            .into_iter()
            .fold(Self::new(), |policy, bucket| policy.with_override(bucket, duration))
    }

    pub fn duration(&self, bucket: CooldownBucket) -> Duration {
        self.overrides
            .get(&bucket)
            .copied()
            .unwrap_or_else(|| bucket.default_duration())
    }

    /// Cooldown that applies to a rule name
    pub fn duration_for_rule(&self, rule_name: &str) -> Duration {
        self.duration(CooldownBucket::for_rule(rule_name))
    }
}
