//! Operation status snapshot

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Pose;
use crate::state::{FaultKind, Phase, PhaseView};
use crate::traits::GripperState;

/// Latched fault information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultDetail {
    /// Phase in which the fault was detected
    pub phase: Phase,
    pub kind: FaultKind,
    pub message: String,
}

impl fmt::Display for FaultDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.kind.name(), self.phase, self.message)
    }
}

/// Owned snapshot of the sequencer state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatus {
    pub phase: Phase,
    pub view: PhaseView,
    /// Index of the target being worked on (or next to start)
    pub target_index: u16,
    /// Targets in the active plan (0 when unconfigured)
    pub total_targets: u16,
    /// Last reported actuator position
    pub position: Pose,
    pub gripper: GripperState,
    pub fault: Option<FaultDetail>,
    /// Detections waiting to be picked
    pub pending_detections: u8,
    /// Stop requested, waiting for the in-flight step
    pub stopping: bool,
}

impl OperationStatus {
    /// Completed fraction of the plan in percent
    pub fn progress_percent(&self) -> u8 {
        if self.total_targets == 0 {
            return 0;
        }
        ((self.target_index as u32 * 100) / self.total_targets as u32).min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        let mut status = OperationStatus {
            phase: Phase::Idle,
            view: PhaseView::Idle,
            target_index: 0,
            total_targets: 0,
            position: Pose::default(),
            gripper: GripperState::Open,
            fault: None,
            pending_detections: 0,
            stopping: false,
        };
        assert_eq!(status.progress_percent(), 0);

        status.total_targets = 4;
        status.target_index = 1;
        assert_eq!(status.progress_percent(), 25);

        status.target_index = 4;
        assert_eq!(status.progress_percent(), 100);
    }

    #[test]
    fn test_fault_display() {
        let detail = FaultDetail {
            phase: Phase::DescendPick,
            kind: FaultKind::Actuator,
            message: "gripper fault".into(),
        };
        assert_eq!(
            detail.to_string(),
            "actuator fault in DESCEND_PICK: gripper fault"
        );
    }
}
