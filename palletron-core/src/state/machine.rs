//! Phase state machine
//!
//! Every actuator action taken by the sequencer is a function of the
//! current phase. Transitions are pure: `(phase, event) -> phase`.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::events::Event;

/// Sequencer phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for a command
    #[default]
    Idle,
    /// Moving to the home pose
    Homing,
    /// Above the pick pose
    ApproachPick,
    /// Down to the pick pose
    DescendPick,
    /// Closing the gripper
    Grip,
    /// Back up above the pick pose
    RetractPick,
    /// Above the place target
    ApproachPlace,
    /// Down to the place target
    DescendPlace,
    /// Opening the gripper
    Release,
    /// Back up above the place target
    RetractPlace,
    /// Fault latched; only recover is accepted
    Fault,
}

/// Collapsed view of the phase for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseView {
    Idle,
    Homing,
    Picking,
    Placing,
    Fault,
}

impl Phase {
    /// Reporting view
    pub fn view(self) -> PhaseView {
        match self {
            Phase::Idle => PhaseView::Idle,
            Phase::Homing => PhaseView::Homing,
            Phase::ApproachPick | Phase::DescendPick | Phase::Grip | Phase::RetractPick => {
                PhaseView::Picking
            }
            Phase::ApproachPlace | Phase::DescendPlace | Phase::Release | Phase::RetractPlace => {
                PhaseView::Placing
            }
            Phase::Fault => PhaseView::Fault,
        }
    }

    /// Check if the sequencer is actively driving the actuator
    pub fn is_running(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Fault)
    }

    pub fn is_fault(self) -> bool {
        self == Phase::Fault
    }

    /// Upper-case name used in logs and fault details
    pub fn name(self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Homing => "HOMING",
            Phase::ApproachPick => "APPROACH_PICK",
            Phase::DescendPick => "DESCEND_PICK",
            Phase::Grip => "GRIP",
            Phase::RetractPick => "RETRACT_PICK",
            Phase::ApproachPlace => "APPROACH_PLACE",
            Phase::DescendPlace => "DESCEND_PLACE",
            Phase::Release => "RELEASE",
            Phase::RetractPlace => "RETRACT_PLACE",
            Phase::Fault => "FAULT",
        }
    }

    /// Process an event and return the next phase
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use Phase::*;

        match (self, event) {
            // Faults latch from anywhere
            (Fault, _) if event != Recover => Fault,
            (_, FaultDetected(_)) => Fault,

            // Commands
            (Idle, Start) => ApproachPick,
            (Idle, HomeRequested) => Homing,
            (Fault, Recover) => Homing,
            (phase, Halt) if phase.is_running() => Idle,

            // Step completions
            (Homing, StepComplete) => Idle,
            (ApproachPick, StepComplete) => DescendPick,
            (DescendPick, StepComplete) => Grip,
            (Grip, StepComplete) => RetractPick,
            (RetractPick, StepComplete) => ApproachPlace,
            (ApproachPlace, StepComplete) => DescendPlace,
            (DescendPlace, StepComplete) => Release,
            (Release, StepComplete) => RetractPlace,

            // End of a pick/place pair
            (RetractPlace, NextTarget) => ApproachPick,
            (RetractPlace, PlanFinished) => Idle,

            // Default: stay in current phase
            _ => self,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FaultKind;

    const ALL: [Phase; 11] = [
        Phase::Idle,
        Phase::Homing,
        Phase::ApproachPick,
        Phase::DescendPick,
        Phase::Grip,
        Phase::RetractPick,
        Phase::ApproachPlace,
        Phase::DescendPlace,
        Phase::Release,
        Phase::RetractPlace,
        Phase::Fault,
    ];

    #[test]
    fn test_full_cycle() {
        let mut phase = Phase::Idle.transition(Event::Start);
        let expected = [
            Phase::DescendPick,
            Phase::Grip,
            Phase::RetractPick,
            Phase::ApproachPlace,
            Phase::DescendPlace,
            Phase::Release,
            Phase::RetractPlace,
        ];
        assert_eq!(phase, Phase::ApproachPick);
        for next in expected {
            phase = phase.transition(Event::StepComplete);
            assert_eq!(phase, next);
        }
        assert_eq!(phase.transition(Event::NextTarget), Phase::ApproachPick);
        assert_eq!(phase.transition(Event::PlanFinished), Phase::Idle);
    }

    #[test]
    fn test_retract_place_waits_for_index_decision() {
        assert_eq!(
            Phase::RetractPlace.transition(Event::StepComplete),
            Phase::RetractPlace
        );
    }

    #[test]
    fn test_fault_from_any_phase() {
        for phase in ALL {
            let next = phase.transition(Event::FaultDetected(FaultKind::Actuator));
            assert_eq!(next, Phase::Fault);
        }
    }

    #[test]
    fn test_fault_only_accepts_recover() {
        let events = [
            Event::Start,
            Event::HomeRequested,
            Event::StepComplete,
            Event::NextTarget,
            Event::PlanFinished,
            Event::Halt,
        ];
        for event in events {
            assert_eq!(Phase::Fault.transition(event), Phase::Fault);
        }
        assert_eq!(Phase::Fault.transition(Event::Recover), Phase::Homing);
    }

    #[test]
    fn test_halt_returns_running_phases_to_idle() {
        for phase in ALL.into_iter().filter(|p| p.is_running()) {
            assert_eq!(phase.transition(Event::Halt), Phase::Idle);
        }
        assert_eq!(Phase::Idle.transition(Event::Halt), Phase::Idle);
    }

    #[test]
    fn test_start_only_from_idle() {
        for phase in ALL.into_iter().filter(|p| *p != Phase::Idle) {
            assert_ne!(phase.transition(Event::Start), Phase::ApproachPick);
        }
    }

    #[test]
    fn test_views() {
        assert_eq!(Phase::Grip.view(), PhaseView::Picking);
        assert_eq!(Phase::RetractPick.view(), PhaseView::Picking);
        assert_eq!(Phase::ApproachPlace.view(), PhaseView::Placing);
        assert_eq!(Phase::RetractPlace.view(), PhaseView::Placing);
        assert_eq!(Phase::Homing.view(), PhaseView::Homing);
        assert_eq!(Phase::DescendPick.to_string(), "DESCEND_PICK");
    }
}
