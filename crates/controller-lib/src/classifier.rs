//! Severity classification for alarm events
//!
//! The monitoring side has already decided that a threshold was breached;
//! this only ranks urgency from the alarm name so the gate and the decision
//! policies can prioritise.

use crate::models::{AlarmEvent, AlarmState, Severity};

/// Ordered name patterns, first match wins
const SEVERITY_PATTERNS: &[(&[&str], Severity)] = &[
    (&["critical"], Severity::Critical),
    (&["high", "error"], Severity::High),
    (&["warning"], Severity::Warning),
];

/// Severity for an active alarm whose name matches no pattern
const FALLBACK_SEVERITY: Severity = Severity::Medium;

/// Classify a single alarm event
pub fn classify(event: &AlarmEvent) -> Severity {
    if event.state != AlarmState::Alarm {
        return Severity::Ok;
    }
    classify_name(&event.alarm_name)
}

/// Severity implied by an alarm name alone
pub fn classify_name(alarm_name: &str) -> Severity {
    let name = alarm_name.to_lowercase();
    SEVERITY_PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| name.contains(needle)))
        .map(|(_, severity)| *severity)
        .unwrap_or(FALLBACK_SEVERITY)
}

/// Classify a batch by its primary (first) alarm
pub fn classify_batch(events: &[AlarmEvent]) -> Severity {
    events.first().map(classify).unwrap_or(Severity::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn alarm(name: &str, state: AlarmState) -> AlarmEvent {
        AlarmEvent {
            cluster_name: "search-a".to_string(),
            namespace: None,
            timestamp: Utc::now(),
            alarm_name: name.to_string(),
            state,
            comparison_operator: "GreaterThanThreshold".to_string(),
            threshold: 80.0,
            value: 95.0,
            reason: String::new(),
            metrics: None,
        }
    }

    #[test]
    fn test_name_patterns() {
        let cases = [
            ("latency-critical", Severity::Critical),
            ("CPU-Critical-Error", Severity::Critical),
            ("cpu-high", Severity::High),
            ("indexing-error-rate", Severity::High),
            ("disk-warning", Severity::Warning),
            ("memory-pressure", Severity::Medium),
            ("disk-full", Severity::Medium),
        ];
        for (name, expected) in cases {
            assert_eq!(classify(&alarm(name, AlarmState::Alarm)), expected, "{}", name);
        }
    }

    #[test]
    fn test_inactive_alarm_is_ok() {
        assert_eq!(classify(&alarm("cpu-critical", AlarmState::Ok)), Severity::Ok);
        assert_eq!(
            classify(&alarm("cpu-critical", AlarmState::InsufficientData)),
            Severity::Ok
        );
    }

    #[test]
    fn test_batch_uses_primary_alarm() {
        assert_eq!(classify_batch(&[]), Severity::None);
        let batch = [
            alarm("cpu-warning", AlarmState::Alarm),
            alarm("latency-critical", AlarmState::Alarm),
        ];
        assert_eq!(classify_batch(&batch), Severity::Warning);
    }
}
