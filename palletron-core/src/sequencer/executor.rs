//! Pick/place sequencer
//!
//! Owns the single actuator and drives it through the phase machine, one
//! actuator poll per tick. Motion steps repeat `request_move` until the
//! actuator reports arrival; gripper steps command once and then poll the
//! actuator status until the gripper has settled.
//!
//! Commands (`start`, `stop`, `recover`, ...) are validated synchronously.
//! Faults found while ticking are latched into the FAULT phase and surface
//! through [`Sequencer::status`].

use heapless::Deque;

use super::error::SequenceError;
use super::status::{FaultDetail, OperationStatus};
use crate::config::{CellConfig, ConfigError, MotionConfig};
use crate::geometry::{FrameTransform, Pose};
use crate::planner::{GridPlanner, PlacementPlan, PlanError};
use crate::safety::{MotionWatchdog, WatchdogStatus};
use crate::state::{Event, FaultKind, Phase};
use crate::traits::{Actuator, ActuatorError, GripperState, MotionReport};

/// Maximum queued vision detections
pub const MAX_DETECTIONS: usize = 8;

/// Validated cell configuration with its derived transform
#[derive(Debug, Clone)]
struct ActiveCell {
    config: CellConfig,
    transform: FrameTransform,
}

/// Progress of the in-flight sub-step
#[derive(Debug, Clone, Copy, Default)]
struct StepProgress {
    /// Gripper command already issued
    commanded: bool,
    /// Polls with the gripper in the requested state
    settle_ticks: u32,
}

/// Where a motion step is headed
#[derive(Debug, Clone, Copy)]
enum Waypoint {
    Pick,
    AbovePick,
    Place,
    AbovePlace,
}

/// Fault found while ticking
#[derive(Debug)]
struct StepFault {
    kind: FaultKind,
    message: String,
}

impl StepFault {
    fn actuator(error: ActuatorError) -> Self {
        Self {
            kind: FaultKind::Actuator,
            message: error.to_string(),
        }
    }

    fn unreachable(error: PlanError) -> Self {
        Self {
            kind: FaultKind::Unreachable,
            message: error.to_string(),
        }
    }

    fn timeout(stalled_ticks: u32) -> Self {
        Self {
            kind: FaultKind::Timeout,
            message: format!("no progress for {stalled_ticks} ticks"),
        }
    }
}

/// Tick-driven pick/place sequencer
pub struct Sequencer<A: Actuator> {
    actuator: A,
    /// Machine limits (fixed at startup)
    motion: MotionConfig,
    cell: Option<ActiveCell>,
    phase: Phase,
    /// Plan index of the pair being worked on
    target_index: usize,
    /// Last reported actuator position
    position: Pose,
    gripper: GripperState,
    fault: Option<FaultDetail>,
    stop_requested: bool,
    step: StepProgress,
    /// Pick pose latched for the current pair
    pick: Option<Pose>,
    detections: Deque<Pose, MAX_DETECTIONS>,
    watchdog: MotionWatchdog,
}

impl<A: Actuator> Sequencer<A> {
    /// Create an unconfigured sequencer in IDLE
    pub fn new(actuator: A, motion: MotionConfig) -> Result<Self, ConfigError> {
        motion.validate()?;
        Ok(Self {
            watchdog: MotionWatchdog::new(motion.max_stall_ticks),
            actuator,
            motion,
            cell: None,
            phase: Phase::Idle,
            target_index: 0,
            position: Pose::default(),
            gripper: GripperState::Open,
            fault: None,
            stop_requested: false,
            step: StepProgress::default(),
            pick: None,
            detections: Deque::new(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    /// Active cell configuration, if configured
    pub fn cell(&self) -> Option<&CellConfig> {
        self.cell.as_ref().map(|c| &c.config)
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Number of targets in the active plan
    pub fn total_targets(&self) -> usize {
        self.cell
            .as_ref()
            .map(|c| c.config.grid.total_targets())
            .unwrap_or(0)
    }

    /// Snapshot of the operation state
    pub fn status(&self) -> OperationStatus {
        OperationStatus {
            phase: self.phase,
            view: self.phase.view(),
            target_index: self.target_index as u16,
            total_targets: self.total_targets() as u16,
            position: self.position,
            gripper: self.gripper,
            fault: self.fault.clone(),
            pending_detections: self.detections.len() as u8,
            stopping: self.stop_requested,
        }
    }

    /// Apply a new cell configuration
    ///
    /// Accepted in IDLE or FAULT. The whole plan, the pick station and the
    /// home pose are checked against the envelope before anything changes.
    /// On success the plan index restarts at 0 and queued detections are
    /// dropped.
    pub fn configure(&mut self, cell: CellConfig) -> Result<(), SequenceError> {
        if !matches!(self.phase, Phase::Idle | Phase::Fault) {
            return Err(SequenceError::InvalidState {
                phase: self.phase,
                command: "configure",
            });
        }

        cell.validate()?;
        let transform = FrameTransform::from_config(&cell.transform)?;

        let planner = GridPlanner::new(&cell.grid, &self.motion.envelope, self.motion.clearance_mm);
        planner.plan()?;
        planner.check_waypoint("pick station", &cell.pick)?;
        if !self.motion.envelope.contains(&cell.home) {
            return Err(PlanError::waypoint("home", &cell.home).into());
        }

        self.cell = Some(ActiveCell {
            config: cell,
            transform,
        });
        self.target_index = 0;
        self.pick = None;
        self.detections.clear();
        Ok(())
    }

    /// Start (or continue) the plan from the current target
    pub fn start(&mut self) -> Result<(), SequenceError> {
        match self.phase {
            Phase::Idle => {}
            Phase::Fault => {
                return Err(SequenceError::InvalidState {
                    phase: self.phase,
                    command: "start",
                })
            }
            _ => return Err(SequenceError::AlreadyRunning),
        }

        let planner = self.planner().ok_or(ConfigError::NotConfigured)?;
        if self.target_index >= planner.len() {
            return Err(SequenceError::PlanComplete);
        }
        planner.target(self.target_index)?;

        self.stop_requested = false;
        if self.pick.is_none() {
            self.begin_pair();
        }
        self.begin_step();
        self.apply(Event::Start);
        Ok(())
    }

    /// Request a stop
    ///
    /// The in-flight sub-step finishes, then the sequencer returns to IDLE.
    /// The plan index only advances if the current pair was completed. A
    /// stop before the gripper closed keeps the latched pick pose.
    pub fn stop(&mut self) -> Result<(), SequenceError> {
        match self.phase {
            Phase::Fault => Err(SequenceError::InvalidState {
                phase: self.phase,
                command: "stop",
            }),
            Phase::Idle => Ok(()),
            _ => {
                self.stop_requested = true;
                Ok(())
            }
        }
    }

    /// Clear a latched fault and re-home
    ///
    /// The interrupted target is restarted from the top on the next start.
    pub fn recover(&mut self) -> Result<(), SequenceError> {
        if self.phase != Phase::Fault {
            return Err(SequenceError::InvalidState {
                phase: self.phase,
                command: "recover",
            });
        }

        self.fault = None;
        self.stop_requested = false;
        self.pick = None;
        self.begin_step();
        self.apply(Event::Recover);
        Ok(())
    }

    /// Move to the home pose (IDLE only)
    pub fn home(&mut self) -> Result<(), SequenceError> {
        self.require_idle("home")?;
        self.begin_step();
        self.apply(Event::HomeRequested);
        Ok(())
    }

    /// Reset the plan index to 0 for a new pallet (IDLE only)
    pub fn rewind(&mut self) -> Result<(), SequenceError> {
        self.require_idle("rewind")?;
        self.target_index = 0;
        Ok(())
    }

    /// Read position and gripper state from the actuator without moving
    pub fn refresh(&mut self) -> Result<(), SequenceError> {
        let status = self.actuator.read_status()?;
        self.position = status.position;
        self.gripper = status.gripper;
        Ok(())
    }

    /// Transform a sensor-frame detection into the base frame
    pub fn transform_detection(&self, sensor: &Pose) -> Result<Pose, SequenceError> {
        if !sensor.is_finite() {
            return Err(ConfigError::NonFinite("detection pose").into());
        }
        let cell = self.cell.as_ref().ok_or(ConfigError::NotConfigured)?;
        Ok(cell.transform.apply(sensor))
    }

    /// Queue a detection as the pick pose of an upcoming pair
    ///
    /// Returns the base-frame pose that was queued.
    pub fn submit_detection(&mut self, sensor: &Pose) -> Result<Pose, SequenceError> {
        if self.phase.is_fault() {
            return Err(SequenceError::InvalidState {
                phase: self.phase,
                command: "detect",
            });
        }

        let base = self.transform_detection(sensor)?;
        if let Some(planner) = self.planner() {
            planner.check_waypoint("detection", &base)?;
        }
        self.detections
            .push_back(base)
            .map_err(|_| SequenceError::DetectionQueueFull)?;
        Ok(base)
    }

    /// Full placement plan for the active configuration
    pub fn plan(&self) -> Result<PlacementPlan, SequenceError> {
        let planner = self.planner().ok_or(ConfigError::NotConfigured)?;
        Ok(planner.plan()?)
    }

    /// Advance the sequence by one actuator poll
    ///
    /// Returns the event applied this tick, if any.
    pub fn tick(&mut self) -> Option<Event> {
        let result = match self.phase {
            Phase::Idle | Phase::Fault => return None,
            Phase::Homing => self.poll_home(),
            Phase::ApproachPick | Phase::RetractPick => self.poll_move(Waypoint::AbovePick),
            Phase::DescendPick => self.poll_move(Waypoint::Pick),
            Phase::Grip => self.poll_gripper(GripperState::Closed),
            Phase::ApproachPlace | Phase::RetractPlace => self.poll_move(Waypoint::AbovePlace),
            Phase::DescendPlace => self.poll_move(Waypoint::Place),
            Phase::Release => self.poll_gripper(GripperState::Open),
        };

        match result {
            Ok(true) => Some(self.finish_step()),
            Ok(false) => None,
            Err(fault) => Some(self.latch_fault(fault)),
        }
    }

    fn planner(&self) -> Option<GridPlanner<'_>> {
        self.cell.as_ref().map(|c| {
            GridPlanner::new(&c.config.grid, &self.motion.envelope, self.motion.clearance_mm)
        })
    }

    fn require_idle(&self, command: &'static str) -> Result<(), SequenceError> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Fault => Err(SequenceError::InvalidState {
                phase: self.phase,
                command,
            }),
            _ => Err(SequenceError::AlreadyRunning),
        }
    }

    fn poll_home(&mut self) -> Result<bool, StepFault> {
        let speed = self.motion.home_speed;
        let report = match self.cell.as_ref().map(|c| c.config.home) {
            Some(home) => {
                if !self.motion.envelope.contains(&home) {
                    return Err(StepFault::unreachable(PlanError::waypoint("home", &home)));
                }
                self.actuator.request_move(&home, speed)
            }
            None => self.actuator.request_home(speed),
        }
        .map_err(StepFault::actuator)?;

        self.track(report)
    }

    fn poll_move(&mut self, waypoint: Waypoint) -> Result<bool, StepFault> {
        let target = self.waypoint(waypoint)?;
        if !self.motion.envelope.contains(&target) {
            return Err(StepFault::unreachable(PlanError::waypoint(
                self.phase.name(),
                &target,
            )));
        }

        let report = self
            .actuator
            .request_move(&target, self.motion.speed)
            .map_err(StepFault::actuator)?;
        self.track(report)
    }

    fn poll_gripper(&mut self, desired: GripperState) -> Result<bool, StepFault> {
        if !self.step.commanded {
            match desired {
                GripperState::Closed => self.actuator.close_gripper(),
                GripperState::Open => self.actuator.open_gripper(),
            }
            .map_err(StepFault::actuator)?;
            self.step.commanded = true;
        }

        let status = self.actuator.read_status().map_err(StepFault::actuator)?;
        self.position = status.position;
        self.gripper = status.gripper;

        if status.gripper == desired {
            self.step.settle_ticks += 1;
            if self.step.settle_ticks > self.motion.gripper_settle_ticks {
                return Ok(true);
            }
        }

        self.watch()?;
        Ok(false)
    }

    fn waypoint(&self, waypoint: Waypoint) -> Result<Pose, StepFault> {
        let clearance = self.motion.clearance_mm;
        match waypoint {
            Waypoint::Pick => self.pick_pose(),
            Waypoint::AbovePick => self.pick_pose().map(|p| p.raised(clearance)),
            Waypoint::Place => self.place_pose(),
            Waypoint::AbovePlace => self.place_pose().map(|p| p.raised(clearance)),
        }
    }

    fn pick_pose(&self) -> Result<Pose, StepFault> {
        self.pick.ok_or_else(|| StepFault {
            kind: FaultKind::Unreachable,
            message: "no pick pose for the current target".into(),
        })
    }

    fn place_pose(&self) -> Result<Pose, StepFault> {
        let planner = self.planner().ok_or_else(|| StepFault {
            kind: FaultKind::Unreachable,
            message: ConfigError::NotConfigured.to_string(),
        })?;
        planner
            .target(self.target_index)
            .map_err(StepFault::unreachable)
    }

    /// Record a motion report and check for progress
    fn track(&mut self, report: MotionReport) -> Result<bool, StepFault> {
        self.position = report.position;
        if report.complete {
            return Ok(true);
        }
        self.watch()?;
        Ok(false)
    }

    fn watch(&mut self) -> Result<(), StepFault> {
        match self.watchdog.observe(&self.position) {
            WatchdogStatus::Ok => Ok(()),
            WatchdogStatus::Timeout { stalled_ticks } => Err(StepFault::timeout(stalled_ticks)),
        }
    }

    /// Latch the pick pose for a new pair
    fn begin_pair(&mut self) {
        self.pick = self
            .detections
            .pop_front()
            .or_else(|| self.cell.as_ref().map(|c| c.config.pick));
    }

    fn begin_step(&mut self) {
        self.step = StepProgress::default();
        self.watchdog.reset();
    }

    fn finish_step(&mut self) -> Event {
        self.begin_step();

        let event = if self.phase == Phase::RetractPlace {
            self.target_index += 1;
            self.pick = None;
            if self.stop_requested {
                Event::Halt
            } else if self.target_index < self.total_targets() {
                self.begin_pair();
                Event::NextTarget
            } else {
                Event::PlanFinished
            }
        } else if self.stop_requested {
            Event::Halt
        } else {
            Event::StepComplete
        };

        if event == Event::Halt {
            self.stop_requested = false;
            // Until the gripper closes, the same pick pose is reused on the next start
            if matches!(
                self.phase,
                Phase::Grip | Phase::RetractPick | Phase::ApproachPlace | Phase::DescendPlace | Phase::Release
            ) {
                self.pick = None;
            }
        }
        self.apply(event)
    }

    fn latch_fault(&mut self, fault: StepFault) -> Event {
        self.fault = Some(FaultDetail {
            phase: self.phase,
            kind: fault.kind,
            message: fault.message,
        });
        self.stop_requested = false;
        self.begin_step();
        self.apply(Event::FaultDetected(fault.kind))
    }

    fn apply(&mut self, event: Event) -> Event {
        self.phase = self.phase.transition(event);
        event
    }
}
