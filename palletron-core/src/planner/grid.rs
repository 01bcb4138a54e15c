//! Grid placement planner
//!
//! Turns a [`GridConfig`] into an ordered list of place targets and
//! derives approach/retract waypoints. Every target is recomputed from the
//! configuration on demand; nothing is cached between calls.

use heapless::Vec;
use thiserror::Error;

use crate::config::{Envelope, FillOrder, GridConfig, MAX_TARGETS};
use crate::geometry::Pose;

/// Planning errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// A grid target or its approach waypoint is outside the envelope
    #[error("target {index} at ({x:.1}, {y:.1}, {z:.1}) is outside the workspace envelope")]
    TargetUnreachable { index: usize, x: f64, y: f64, z: f64 },
    /// A fixed waypoint (home, pick, detection) is outside the envelope
    #[error("{name} at ({x:.1}, {y:.1}, {z:.1}) is outside the workspace envelope")]
    WaypointUnreachable {
        name: &'static str,
        x: f64,
        y: f64,
        z: f64,
    },
    #[error("target index {index} is past the end of a {total}-target plan")]
    IndexOutOfRange { index: usize, total: usize },
}

impl PlanError {
    pub(crate) fn waypoint(name: &'static str, pose: &Pose) -> Self {
        PlanError::WaypointUnreachable {
            name,
            x: pose.x,
            y: pose.y,
            z: pose.z,
        }
    }
}

/// Ordered placement targets
#[derive(Debug, Clone, Default)]
pub struct PlacementPlan {
    targets: Vec<Pose, MAX_TARGETS>,
}

impl PlacementPlan {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pose> {
        self.targets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pose> {
        self.targets.iter()
    }

    pub fn as_slice(&self) -> &[Pose] {
        &self.targets
    }
}

/// Planner over a borrowed grid configuration
#[derive(Debug, Clone, Copy)]
pub struct GridPlanner<'a> {
    grid: &'a GridConfig,
    envelope: &'a Envelope,
    clearance_mm: f64,
}

impl<'a> GridPlanner<'a> {
    /// Create a planner
    ///
    /// The grid and clearance are expected to be validated already
    /// (see [`GridConfig::validate`] and `MotionConfig::validate`).
    pub fn new(grid: &'a GridConfig, envelope: &'a Envelope, clearance_mm: f64) -> Self {
        Self {
            grid,
            envelope,
            clearance_mm,
        }
    }

    /// Number of targets
    pub fn len(&self) -> usize {
        self.grid.total_targets()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a plan index to (row, col) according to the fill order
    pub fn cell(&self, index: usize) -> Option<(usize, usize)> {
        let rows = self.grid.rows as usize;
        let cols = self.grid.cols as usize;
        if index >= rows * cols {
            return None;
        }

        let cell = match self.grid.fill_order {
            FillOrder::RowMajor => (index / cols, index % cols),
            FillOrder::Serpentine => {
                let row = index / cols;
                let step = index % cols;
                if row % 2 == 0 {
                    (row, step)
                } else {
                    (row, cols - 1 - step)
                }
            }
            FillOrder::ColumnMajor => (index % rows, index / rows),
        };
        Some(cell)
    }

    /// Place target for a plan index
    pub fn target(&self, index: usize) -> Result<Pose, PlanError> {
        let (row, col) = self.cell(index).ok_or(PlanError::IndexOutOfRange {
            index,
            total: self.len(),
        })?;

        let origin = &self.grid.origin;
        let target = Pose {
            x: origin.x + col as f64 * self.grid.spacing.dx,
            y: origin.y + row as f64 * self.grid.spacing.dy,
            z: origin.z + self.grid.place_height(),
            ..*origin
        };

        let approach = self.approach(&target);
        if !self.envelope.contains(&target) || !self.envelope.contains(&approach) {
            return Err(PlanError::TargetUnreachable {
                index,
                x: target.x,
                y: target.y,
                z: target.z,
            });
        }
        Ok(target)
    }

    /// All targets in fill order
    pub fn plan(&self) -> Result<PlacementPlan, PlanError> {
        let mut plan = PlacementPlan::default();
        for index in 0..self.len() {
            let target = self.target(index)?;
            // rows and cols are capped so the plan always fits
            if plan.targets.push(target).is_err() {
                return Err(PlanError::IndexOutOfRange {
                    index,
                    total: MAX_TARGETS,
                });
            }
        }
        Ok(plan)
    }

    /// Approach waypoint: same x/y/orientation, raised by the clearance
    pub fn approach(&self, target: &Pose) -> Pose {
        target.raised(self.clearance_mm)
    }

    /// Retract waypoint: identical to the approach waypoint
    pub fn retract(&self, target: &Pose) -> Pose {
        self.approach(target)
    }

    /// Check a fixed waypoint and its approach against the envelope
    pub fn check_waypoint(&self, name: &'static str, pose: &Pose) -> Result<(), PlanError> {
        if self.envelope.contains(pose) && self.envelope.contains(&self.approach(pose)) {
            Ok(())
        } else {
            Err(PlanError::waypoint(name, pose))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoxDims, Spacing};
    use crate::geometry::DEFAULT_TOLERANCE;
    use proptest::prelude::*;

    fn grid_2x2() -> GridConfig {
        GridConfig {
            rows: 2,
            cols: 2,
            spacing: Spacing { dx: 100.0, dy: 100.0 },
            origin: Pose::new(0.0, 0.0, 0.0),
            box_size: BoxDims {
                width: 100.0,
                depth: 100.0,
                height: 50.0,
            },
            place_height: Some(50.0),
            fill_order: FillOrder::RowMajor,
        }
    }

    fn envelope() -> Envelope {
        Envelope {
            min: [-500.0, -500.0, 0.0],
            max: [500.0, 500.0, 500.0],
        }
    }

    #[test]
    fn test_2x2_row_major() {
        let grid = grid_2x2();
        let env = envelope();
        let planner = GridPlanner::new(&grid, &env, 50.0);
        let plan = planner.plan().unwrap();

        let expected = [
            Pose::new(0.0, 0.0, 50.0),
            Pose::new(100.0, 0.0, 50.0),
            Pose::new(0.0, 100.0, 50.0),
            Pose::new(100.0, 100.0, 50.0),
        ];
        assert_eq!(plan.len(), 4);
        for (got, want) in plan.iter().zip(expected.iter()) {
            assert!(got.approx_eq(want, DEFAULT_TOLERANCE), "{got:?} != {want:?}");
        }

        let approach = planner.approach(plan.get(0).unwrap());
        assert!(approach.approx_eq(&Pose::new(0.0, 0.0, 100.0), DEFAULT_TOLERANCE));
        let retract = planner.retract(plan.get(3).unwrap());
        assert!(retract.approx_eq(&Pose::new(100.0, 100.0, 100.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_2x2_on_floor() {
        let mut grid = grid_2x2();
        grid.place_height = Some(0.0);
        let env = envelope();
        let plan = GridPlanner::new(&grid, &env, 50.0).plan().unwrap();

        let positions: std::vec::Vec<_> = plan.iter().map(|p| p.position()).collect();
        assert_eq!(
            positions,
            [
                [0.0, 0.0, 0.0],
                [100.0, 0.0, 0.0],
                [0.0, 100.0, 0.0],
                [100.0, 100.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_serpentine_and_column_major() {
        let mut grid = grid_2x2();
        let env = envelope();

        grid.fill_order = FillOrder::Serpentine;
        let planner = GridPlanner::new(&grid, &env, 50.0);
        let cells: std::vec::Vec<_> = (0..4).filter_map(|i| planner.cell(i)).collect();
        assert_eq!(cells, [(0, 0), (0, 1), (1, 1), (1, 0)]);

        grid.fill_order = FillOrder::ColumnMajor;
        let planner = GridPlanner::new(&grid, &env, 50.0);
        let cells: std::vec::Vec<_> = (0..4).filter_map(|i| planner.cell(i)).collect();
        assert_eq!(cells, [(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_orientation_follows_origin() {
        let mut grid = grid_2x2();
        grid.origin = Pose::new(10.0, 20.0, 5.0).with_yaw(90.0);
        let env = envelope();
        let planner = GridPlanner::new(&grid, &env, 50.0);
        let target = planner.target(3).unwrap();
        assert!(target.approx_eq(&Pose::new(110.0, 120.0, 55.0).with_yaw(90.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_index_out_of_range() {
        let grid = grid_2x2();
        let env = envelope();
        let planner = GridPlanner::new(&grid, &env, 50.0);
        assert_eq!(planner.cell(4), None);
        assert_eq!(
            planner.target(4).unwrap_err(),
            PlanError::IndexOutOfRange { index: 4, total: 4 }
        );
    }

    #[test]
    fn test_target_outside_envelope() {
        let mut grid = grid_2x2();
        grid.origin = Pose::new(450.0, 0.0, 0.0);
        let env = envelope();
        let planner = GridPlanner::new(&grid, &env, 50.0);
        assert!(planner.target(0).is_ok());
        assert!(matches!(
            planner.target(1),
            Err(PlanError::TargetUnreachable { index: 1, .. })
        ));
        assert!(planner.plan().is_err());
    }

    #[test]
    fn test_approach_outside_envelope() {
        let mut grid = grid_2x2();
        grid.origin = Pose::new(0.0, 0.0, 420.0);
        let env = envelope();
        // Target z = 470 fits, approach z = 520 does not
        let planner = GridPlanner::new(&grid, &env, 50.0);
        assert!(matches!(
            planner.target(0),
            Err(PlanError::TargetUnreachable { index: 0, .. })
        ));
    }

    #[test]
    fn test_check_waypoint() {
        let grid = grid_2x2();
        let env = envelope();
        let planner = GridPlanner::new(&grid, &env, 50.0);
        assert!(planner.check_waypoint("pick", &Pose::new(0.0, 0.0, 10.0)).is_ok());
        assert!(matches!(
            planner.check_waypoint("pick", &Pose::new(0.0, 0.0, 480.0)),
            Err(PlanError::WaypointUnreachable { name: "pick", .. })
        ));
    }

    proptest! {
        #[test]
        fn test_plan_size_and_determinism(
            rows in 1u8..=10,
            cols in 1u8..=10,
            dx in 100.0f64..150.0,
            dy in 100.0f64..150.0,
            order in 0u8..3,
        ) {
            let grid = GridConfig {
                rows,
                cols,
                spacing: Spacing { dx, dy },
                origin: Pose::new(-700.0, -700.0, 0.0),
                fill_order: match order {
                    0 => FillOrder::RowMajor,
                    1 => FillOrder::Serpentine,
                    _ => FillOrder::ColumnMajor,
                },
                ..GridConfig::default()
            };
            let env = Envelope {
                min: [-1000.0, -1000.0, 0.0],
                max: [1000.0, 1000.0, 1000.0],
            };
            let planner = GridPlanner::new(&grid, &env, 50.0);
            let first = planner.plan().unwrap();
            let second = planner.plan().unwrap();

            prop_assert_eq!(first.len(), rows as usize * cols as usize);
            for (a, b) in first.iter().zip(second.iter()) {
                prop_assert_eq!(a.position(), b.position());
                prop_assert!(env.contains(a));
            }

            // Every cell is visited exactly once
            let mut seen = [[false; 10]; 10];
            for i in 0..first.len() {
                let (r, c) = planner.cell(i).unwrap();
                prop_assert!(!seen[r][c]);
                seen[r][c] = true;
            }
        }
    }
}
