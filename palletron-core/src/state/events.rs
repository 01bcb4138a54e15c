//! Events that trigger phase transitions

use serde::{Deserialize, Serialize};

/// Kinds of faults that latch the FAULT phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// Actuator returned an error
    Actuator,
    /// No progress within the watchdog window
    Timeout,
    /// Pose outside the workspace envelope
    Unreachable,
}

impl FaultKind {
    pub fn name(self) -> &'static str {
        match self {
            FaultKind::Actuator => "actuator fault",
            FaultKind::Timeout => "timeout",
            FaultKind::Unreachable => "unreachable pose",
        }
    }
}

/// Events that can trigger phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Command events
    /// Start the plan from the current target
    Start,
    /// Explicit home request
    HomeRequested,
    /// Stop requested and the in-flight step has finished
    Halt,
    /// Leave FAULT and re-home
    Recover,

    // Sequencer events
    /// Current sub-step finished
    StepComplete,
    /// Pair finished, more targets remain
    NextTarget,
    /// Pair finished, plan exhausted
    PlanFinished,

    // Safety events
    FaultDetected(FaultKind),
}
