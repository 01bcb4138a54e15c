//! Sequencer command errors

use thiserror::Error;

use crate::config::ConfigError;
use crate::planner::PlanError;
use crate::state::Phase;
use crate::traits::ActuatorError;

/// Errors returned synchronously by sequencer commands
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("unreachable target: {0}")]
    UnreachableTarget(#[from] PlanError),
    /// A run or homing move is already in progress
    #[error("sequence already running")]
    AlreadyRunning,
    /// Command not accepted in the current phase
    #[error("`{command}` is not accepted in {phase}")]
    InvalidState { phase: Phase, command: &'static str },
    #[error("actuator fault: {0}")]
    ActuatorFault(#[from] ActuatorError),
    /// Every target of the plan has been placed
    #[error("plan complete; rewind to start a new pallet")]
    PlanComplete,
    #[error("detection queue is full")]
    DetectionQueueFull,
}
