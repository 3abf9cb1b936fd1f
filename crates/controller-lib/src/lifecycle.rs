//! Cluster phase state machine
//!
//! ```text
//! READY    --ScaleRequested-->     SCALING
//! SCALING  --ScaleSucceeded-->     READY
//! SCALING  --ScaleFailed-->        ERROR
//! PENDING  --ProvisionStarted-->   CREATING
//! PENDING  |
//! CREATING --ProvisionSucceeded--> READY
//! PENDING  |
//! CREATING --ProvisionFailed-->    ERROR
//! ERROR    --Recovered-->          READY
//! READY    --Faulted-->            ERROR
//! any      --DeleteRequested-->    DELETING
//! ```
//!
//! Only READY accepts scaling work. Every other pair is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::control_plane::ControlPlaneStatus;
use crate::error::{RemediationError, RemediationResult};
use crate::models::{ClusterRecord, Phase};

/// Inputs to the phase machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseEvent {
    ScaleRequested,
    ScaleSucceeded,
    ScaleFailed,
    ProvisionStarted,
    ProvisionSucceeded,
    ProvisionFailed,
    Recovered,
    Faulted,
    DeleteRequested,
}

impl Phase {
    /// Next phase for `event`, or `InvalidTransition`
    pub fn apply(self, event: PhaseEvent) -> RemediationResult<Phase> {
        use Phase::*;
        use PhaseEvent::*;

        let next = match (self, event) {
            (_, DeleteRequested) => Deleting,
            (Ready, ScaleRequested) => Scaling,
            (Scaling, ScaleSucceeded) => Ready,
            (Scaling, ScaleFailed) => Error,
            (Pending, ProvisionStarted) => Creating,
            (Pending | Creating, ProvisionSucceeded) => Ready,
            (Pending | Creating, ProvisionFailed) => Error,
            (Error, Recovered) => Ready,
            (Ready, Faulted) => Error,
            (from, event) => return Err(RemediationError::InvalidTransition { from, event }),
        };
        Ok(next)
    }

    /// Phases that reject new scaling work
    pub fn is_busy(self) -> bool {
        self != Phase::Ready
    }

    /// Event implied by the control plane's view of the cluster, if any
    pub fn sync_event(self, observed: ControlPlaneStatus) -> Option<PhaseEvent> {
        match (self, observed) {
            (Phase::Error, ControlPlaneStatus::Active) => Some(PhaseEvent::Recovered),
            (Phase::Pending | Phase::Creating, ControlPlaneStatus::Active) => {
                Some(PhaseEvent::ProvisionSucceeded)
            }
            (Phase::Ready, ControlPlaneStatus::Error) => Some(PhaseEvent::Faulted),
            (Phase::Pending | Phase::Creating, ControlPlaneStatus::Error) => {
                Some(PhaseEvent::ProvisionFailed)
            }
            _ => None,
        }
    }
}

impl ClusterRecord {
    /// Apply a phase event and stamp the status
    pub fn transition(&mut self, event: PhaseEvent, now: DateTime<Utc>) -> RemediationResult<Phase> {
        let next = self.status.phase.apply(event)?;
        self.status.phase = next;
        self.status.last_updated = now;
        Ok(next)
    }
}
