//! Simulated three-axis gantry
//!
//! Each motion request advances the carriage one simulated time step
//! toward the target. All axes are synchronised on the axis with the
//! largest travel, so the carriage follows a straight line and every
//! axis arrives together.

use palletron_core::config::MAX_SPEED;
use palletron_core::geometry::Pose;
use palletron_core::traits::{
    Actuator, ActuatorError, ActuatorStatus, GripperState, MotionReport,
};
use serde::{Deserialize, Serialize};

const AXES: [char; 3] = ['x', 'y', 'z'];

/// Simulator settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated seconds advanced per motion request
    pub dt_s: f64,
    /// Symmetric travel limit per axis (mm)
    pub limits: [f64; 3],
    /// Position reached by the homing routine
    pub home: Pose,
    /// Carriage position at power-up
    pub initial: Pose,
    /// Status reads before a gripper command takes effect
    pub gripper_delay_polls: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt_s: 0.5,
            limits: [1000.0; 3],
            home: Pose::new(0.0, 0.0, 400.0),
            initial: Pose::new(0.0, 0.0, 400.0),
            gripper_delay_polls: 0,
        }
    }
}

/// Active straight-line move
#[derive(Debug, Clone, Copy)]
struct Segment {
    target: [f64; 3],
    velocity: [f64; 3],
}

/// Simulated gantry with a parallel gripper
pub struct SimGantry {
    config: SimConfig,
    position: Pose,
    segment: Option<Segment>,
    gripper: GripperState,
    /// Commanded gripper state and remaining delay
    pending_gripper: Option<(GripperState, u32)>,
    fault: Option<ActuatorError>,
}

impl SimGantry {
    pub fn new(config: SimConfig) -> Self {
        Self {
            position: config.initial,
            config,
            segment: None,
            gripper: GripperState::Open,
            pending_gripper: None,
            fault: None,
        }
    }

    pub fn position(&self) -> Pose {
        self.position
    }

    pub fn gripper(&self) -> GripperState {
        self.gripper
    }

    /// Make every subsequent request fail with `error`
    pub fn inject_fault(&mut self, error: ActuatorError) {
        self.fault = Some(error);
        self.segment = None;
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    fn check_fault(&self) -> Result<(), ActuatorError> {
        match &self.fault {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn check_speed(speed: f64) -> Result<(), ActuatorError> {
        if speed.is_finite() && speed > 0.0 && speed <= MAX_SPEED {
            Ok(())
        } else {
            Err(ActuatorError::InvalidSpeed(speed))
        }
    }

    fn check_limits(&self, target: &[f64; 3]) -> Result<(), ActuatorError> {
        for ((axis, value), limit) in AXES.iter().zip(target).zip(&self.config.limits) {
            if !value.is_finite() || value.abs() > *limit {
                return Err(ActuatorError::LimitExceeded {
                    axis: *axis,
                    value: *value,
                    limit: *limit,
                });
            }
        }
        Ok(())
    }

    /// Plan a synchronised move from the current position
    fn plan(&self, target: [f64; 3], speed: f64) -> Segment {
        let start = self.position.position();
        let delta = [
            target[0] - start[0],
            target[1] - start[1],
            target[2] - start[2],
        ];
        let dominant = delta.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
        let duration = dominant / speed;
        let velocity = delta.map(|d| d / duration);
        Segment { target, velocity }
    }

    fn advance(&mut self, target: &Pose, speed: f64) -> Result<MotionReport, ActuatorError> {
        self.check_fault()?;
        Self::check_speed(speed)?;
        let goal = target.position();
        self.check_limits(&goal)?;

        if self.position.position() == goal {
            self.segment = None;
            self.position = *target;
            return Ok(MotionReport {
                position: self.position,
                complete: true,
            });
        }

        let segment = match self.segment {
            Some(segment) if segment.target == goal => segment,
            _ => self.plan(goal, speed),
        };

        let mut next = self.position.position();
        for (p, v) in next.iter_mut().zip(segment.velocity) {
            *p += v * self.config.dt_s;
        }

        // Overshoot on any moving axis means the carriage has arrived
        let arrived = next
            .iter()
            .zip(goal)
            .zip(segment.velocity)
            .all(|((p, g), v)| (g - p) * v <= 0.0);

        if arrived {
            self.position = *target;
            self.segment = None;
        } else {
            self.position.x = next[0];
            self.position.y = next[1];
            self.position.z = next[2];
            self.segment = Some(segment);
        }

        Ok(MotionReport {
            position: self.position,
            complete: arrived,
        })
    }

    fn command_gripper(&mut self, state: GripperState) -> Result<(), ActuatorError> {
        self.check_fault()?;
        if self.config.gripper_delay_polls == 0 {
            self.gripper = state;
            self.pending_gripper = None;
        } else {
            self.pending_gripper = Some((state, self.config.gripper_delay_polls));
        }
        Ok(())
    }
}

impl Default for SimGantry {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Actuator for SimGantry {
    fn request_move(&mut self, target: &Pose, speed: f64) -> Result<MotionReport, ActuatorError> {
        self.advance(target, speed)
    }

    fn request_home(&mut self, speed: f64) -> Result<MotionReport, ActuatorError> {
        let home = self.config.home;
        self.advance(&home, speed)
    }

    fn close_gripper(&mut self) -> Result<(), ActuatorError> {
        self.command_gripper(GripperState::Closed)
    }

    fn open_gripper(&mut self) -> Result<(), ActuatorError> {
        self.command_gripper(GripperState::Open)
    }

    fn read_status(&mut self) -> Result<ActuatorStatus, ActuatorError> {
        self.check_fault()?;
        if let Some((state, remaining)) = self.pending_gripper {
            if remaining <= 1 {
                self.gripper = state;
                self.pending_gripper = None;
            } else {
                self.pending_gripper = Some((state, remaining - 1));
            }
        }
        Ok(ActuatorStatus {
            position: self.position,
            gripper: self.gripper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palletron_core::config::{CellConfig, MotionConfig};
    use palletron_core::geometry::DEFAULT_TOLERANCE;
    use palletron_core::sequencer::Sequencer;
    use palletron_core::state::Phase;
    use proptest::prelude::*;

    fn gantry_at_origin() -> SimGantry {
        SimGantry::new(SimConfig {
            dt_s: 1.0,
            initial: Pose::new(0.0, 0.0, 0.0),
            ..SimConfig::default()
        })
    }

    fn run_move(gantry: &mut SimGantry, target: &Pose, speed: f64) -> u32 {
        for polls in 1..10_000 {
            if gantry.request_move(target, speed).unwrap().complete {
                return polls;
            }
        }
        panic!("move never completed");
    }

    #[test]
    fn test_move_takes_dominant_axis_time() {
        let mut gantry = gantry_at_origin();
        let polls = run_move(&mut gantry, &Pose::new(100.0, 20.0, 0.0), 50.0);
        // 100 mm at 50 mm/s in 1 s steps: two full steps land exactly on target
        assert_eq!(polls, 2);
        assert!(gantry.position().approx_eq(&Pose::new(100.0, 20.0, 0.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_axes_stay_on_straight_line() {
        let mut gantry = gantry_at_origin();
        let target = Pose::new(300.0, 150.0, -60.0);
        let report = gantry.request_move(&target, 100.0).unwrap();
        assert!(!report.complete);
        assert!((report.position.x - 100.0).abs() < 1e-9);
        assert!((report.position.y - 50.0).abs() < 1e-9);
        assert!((report.position.z + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_step_snaps_to_target() {
        let mut gantry = gantry_at_origin();
        let target = Pose::new(0.0, 0.0, 75.0);
        assert!(!gantry.request_move(&target, 50.0).unwrap().complete);
        let report = gantry.request_move(&target, 50.0).unwrap();
        assert!(report.complete);
        assert_eq!(report.position.z, 75.0);
    }

    #[test]
    fn test_already_at_target() {
        let mut gantry = gantry_at_origin();
        let report = gantry.request_move(&Pose::new(0.0, 0.0, 0.0), 10.0).unwrap();
        assert!(report.complete);
        assert!(report.position.approx_eq(&Pose::new(0.0, 0.0, 0.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_new_target_replans() {
        let mut gantry = gantry_at_origin();
        gantry.request_move(&Pose::new(500.0, 0.0, 0.0), 100.0).unwrap();
        let report = gantry.request_move(&Pose::new(100.0, 0.0, 0.0), 100.0).unwrap();
        assert!(report.complete);
        assert_eq!(report.position.x, 100.0);
    }

    #[test]
    fn test_speed_range() {
        let mut gantry = gantry_at_origin();
        let target = Pose::new(10.0, 0.0, 0.0);
        for speed in [0.0, -5.0, 100.5, f64::NAN] {
            assert!(matches!(
                gantry.request_move(&target, speed),
                Err(ActuatorError::InvalidSpeed(_))
            ));
        }
        assert!(gantry.request_move(&target, 100.0).is_ok());
    }

    #[test]
    fn test_axis_limits() {
        let mut gantry = gantry_at_origin();
        assert_eq!(
            gantry.request_move(&Pose::new(0.0, 1200.0, 0.0), 50.0).unwrap_err(),
            ActuatorError::LimitExceeded {
                axis: 'y',
                value: 1200.0,
                limit: 1000.0
            }
        );
        assert!(gantry.request_move(&Pose::new(-1000.0, 0.0, 0.0), 50.0).is_ok());
    }

    #[test]
    fn test_home_goes_to_configured_pose() {
        let mut gantry = gantry_at_origin();
        let mut polls = 0;
        while !gantry.request_home(100.0).unwrap().complete {
            polls += 1;
            assert!(polls < 100);
        }
        assert!(gantry.position().approx_eq(&Pose::new(0.0, 0.0, 400.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_orientation_taken_from_target() {
        let mut gantry = gantry_at_origin();
        let target = Pose::new(50.0, 0.0, 0.0).with_yaw(90.0);
        run_move(&mut gantry, &target, 100.0);
        assert_eq!(gantry.position().yaw, 90.0);
    }

    #[test]
    fn test_gripper_immediate() {
        let mut gantry = gantry_at_origin();
        gantry.close_gripper().unwrap();
        assert_eq!(gantry.read_status().unwrap().gripper, GripperState::Closed);
        gantry.open_gripper().unwrap();
        assert_eq!(gantry.gripper(), GripperState::Open);
    }

    #[test]
    fn test_gripper_delay() {
        let mut gantry = SimGantry::new(SimConfig {
            gripper_delay_polls: 3,
            ..SimConfig::default()
        });
        gantry.close_gripper().unwrap();
        assert_eq!(gantry.read_status().unwrap().gripper, GripperState::Open);
        assert_eq!(gantry.read_status().unwrap().gripper, GripperState::Open);
        assert_eq!(gantry.read_status().unwrap().gripper, GripperState::Closed);
    }

    #[test]
    fn test_injected_fault() {
        let mut gantry = gantry_at_origin();
        gantry.inject_fault(ActuatorError::Disconnected);
        assert_eq!(
            gantry.request_move(&Pose::new(1.0, 0.0, 0.0), 10.0).unwrap_err(),
            ActuatorError::Disconnected
        );
        assert_eq!(gantry.close_gripper().unwrap_err(), ActuatorError::Disconnected);
        assert!(gantry.read_status().is_err());

        gantry.clear_fault();
        assert!(gantry.read_status().is_ok());
    }

    #[test]
    fn test_drives_full_sequence() {
        let motion = MotionConfig::default();
        let mut sequencer = Sequencer::new(SimGantry::default(), motion).unwrap();
        sequencer.configure(CellConfig::default()).unwrap();
        sequencer.start().unwrap();

        let mut ticks = 0;
        while sequencer.phase() != Phase::Idle {
            sequencer.tick();
            ticks += 1;
            assert!(ticks < 5_000, "sequence stuck in {}", sequencer.phase());
        }

        assert_eq!(sequencer.target_index(), 4);
        assert_eq!(sequencer.actuator().gripper(), GripperState::Open);
    }

    proptest! {
        #[test]
        fn prop_moves_always_arrive(
            x in -1000.0f64..1000.0,
            y in -1000.0f64..1000.0,
            z in -1000.0f64..1000.0,
            speed in 1.0f64..100.0,
        ) {
            let mut gantry = SimGantry::new(SimConfig { dt_s: 5.0, ..SimConfig::default() });
            let target = Pose::new(x, y, z);
            let mut arrived = false;
            for _ in 0..1_000 {
                if gantry.request_move(&target, speed).unwrap().complete {
                    arrived = true;
                    break;
                }
            }
            prop_assert!(arrived);
            prop_assert!(gantry.position().approx_eq(&target, DEFAULT_TOLERANCE));
        }
    }
}
