//! Actuator trait
//!
//! The sequencer drives exactly one actuator through this interface.
//! Motion requests are non-blocking: each call advances the move and
//! reports whether it has arrived, and the sequencer repeats the request
//! on every tick until it has.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Pose;

/// Gripper state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GripperState {
    #[default]
    Open,
    Closed,
}

/// Result of a motion request
#[derive(Debug, Clone, Copy)]
pub struct MotionReport {
    /// Position after this poll
    pub position: Pose,
    /// Target reached
    pub complete: bool,
}

/// Snapshot read back from the actuator
#[derive(Debug, Clone, Copy)]
pub struct ActuatorStatus {
    pub position: Pose,
    pub gripper: GripperState,
}

/// Errors reported by an actuator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActuatorError {
    /// Requested coordinate beyond an axis limit
    #[error("{axis} = {value:.1} mm is beyond the {limit:.1} mm axis limit")]
    LimitExceeded { axis: char, value: f64, limit: f64 },
    /// Requested speed outside the supported range
    #[error("speed {0} is outside the supported range")]
    InvalidSpeed(f64),
    /// Gripper did not respond
    #[error("gripper fault")]
    Gripper,
    /// Actuator not reachable
    #[error("actuator disconnected")]
    Disconnected,
    /// Fault reported by the actuator itself
    #[error("actuator reported: {0}")]
    Reported(String),
}

/// Single actuator (gantry or arm) with a parallel gripper
pub trait Actuator {
    /// Move toward `target` at `speed` (mm/s)
    ///
    /// Called repeatedly with the same target until the report says
    /// `complete`.
    fn request_move(&mut self, target: &Pose, speed: f64) -> Result<MotionReport, ActuatorError>;

    /// Run the actuator's own homing routine
    fn request_home(&mut self, speed: f64) -> Result<MotionReport, ActuatorError>;

    /// Command the gripper closed
    fn close_gripper(&mut self) -> Result<(), ActuatorError>;

    /// Command the gripper open
    fn open_gripper(&mut self) -> Result<(), ActuatorError>;

    /// Read position and gripper state
    fn read_status(&mut self) -> Result<ActuatorStatus, ActuatorError>;
}
