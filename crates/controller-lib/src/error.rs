//! Error types for the remediation core

use thiserror::Error;

use crate::lifecycle::PhaseEvent;
use crate::models::Phase;

/// Result type alias for remediation operations.
pub type RemediationResult<T> = Result<T, RemediationError>;

/// Errors raised by the cluster-state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cluster {0} not found")]
    NotFound(String),

    #[error("conflicting write for cluster {0}")]
    Conflict(String),

    #[error("cluster store unavailable: {0}")]
    Backend(String),
}

/// Errors that abort one reconciliation.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("invalid alarm event: {0}")]
    InvalidEvent(String),

    #[error("cluster {0} has no threshold configuration")]
    MissingThresholds(String),

    #[error("invalid cluster spec: {0}")]
    InvalidSpec(String),

    #[error("phase {from} does not accept {event:?}")]
    InvalidTransition { from: Phase, event: PhaseEvent },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("control plane error: {0}")]
    ControlPlane(String),
}

impl RemediationError {
    /// Input problems the caller can fix, as opposed to infrastructure failures
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            RemediationError::InvalidEvent(_)
                | RemediationError::MissingThresholds(_)
                | RemediationError::InvalidSpec(_)
        )
    }
}
