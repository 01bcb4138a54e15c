//! Cell and motion configuration types
//!
//! The cell configuration (grid, camera mount, home and pick station) is
//! set at configure time and persisted. The motion configuration holds
//! machine limits and is fixed at startup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Pose;

/// Maximum grid rows
pub const MAX_ROWS: u8 = 10;
/// Maximum grid columns
pub const MAX_COLS: u8 = 10;
/// Maximum number of placement targets in one plan
pub const MAX_TARGETS: usize = MAX_ROWS as usize * MAX_COLS as usize;
/// Minimum vertical clearance for approach/retract waypoints (mm)
pub const MIN_CLEARANCE_MM: f64 = 50.0;
/// Maximum commanded speed (mm per second)
pub const MAX_SPEED: f64 = 100.0;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No cell configuration has been applied
    #[error("cell is not configured")]
    NotConfigured,
    /// Grid dimensions out of range
    #[error("grid must have 1..=10 rows and 1..=10 columns, got {rows}x{cols}")]
    GridSize { rows: u8, cols: u8 },
    /// Grid spacing not positive or smaller than the box footprint
    #[error("grid spacing ({dx}, {dy}) must be positive and cover the box footprint")]
    Spacing { dx: f64, dy: f64 },
    /// Box dimensions not positive
    #[error("box dimensions must be positive")]
    BoxSize,
    /// A numeric field is NaN or infinite
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    /// A rotation parameter required by the convention is absent
    #[error("rotation convention `{convention}` requires `{parameter}`")]
    MissingRotationParameter {
        convention: &'static str,
        parameter: &'static str,
    },
    /// Explicit rotation matrix is not a proper rotation
    #[error("rotation matrix is not orthonormal with determinant 1")]
    NotOrthonormal,
    /// Approach clearance too small
    #[error("clearance {0} mm is below the 50 mm minimum")]
    Clearance(f64),
    /// Speed outside 0 < speed <= 100
    #[error("speed {0} must be within (0, 100]")]
    Speed(f64),
    /// Envelope min is not below max on every axis
    #[error("workspace envelope is empty")]
    Envelope,
    /// Gripper settle delay would always trip the watchdog
    #[error("gripper settle ticks ({settle}) must be below max stall ticks ({stall})")]
    SettleTicks { settle: u32, stall: u32 },
}

/// Order in which grid cells are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOrder {
    /// Row by row, left to right
    #[default]
    RowMajor,
    /// Row by row, alternating direction
    Serpentine,
    /// Column by column
    ColumnMajor,
}

/// Box dimensions (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDims {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Default for BoxDims {
    fn default() -> Self {
        Self {
            width: 100.0,
            depth: 100.0,
            height: 50.0,
        }
    }
}

/// Grid cell pitch (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    /// Column pitch along X
    pub dx: f64,
    /// Row pitch along Y
    pub dy: f64,
}

impl Default for Spacing {
    fn default() -> Self {
        Self { dx: 120.0, dy: 120.0 }
    }
}

/// Pallet grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of rows (1..=10)
    pub rows: u8,
    /// Number of columns (1..=10)
    pub cols: u8,
    /// Cell pitch
    pub spacing: Spacing,
    /// Pose of cell (0, 0); its orientation is used for every target
    pub origin: Pose,
    /// Box size
    #[serde(default)]
    pub box_size: BoxDims,
    /// Place height above origin z (defaults to the box height)
    #[serde(default)]
    pub place_height: Option<f64>,
    /// Fill order
    #[serde(default)]
    pub fill_order: FillOrder,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            spacing: Spacing::default(),
            origin: Pose::new(200.0, 200.0, 0.0),
            box_size: BoxDims::default(),
            place_height: None,
            fill_order: FillOrder::RowMajor,
        }
    }
}

impl GridConfig {
    /// Number of targets in the plan
    pub fn total_targets(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Effective place height above origin z
    pub fn place_height(&self) -> f64 {
        self.place_height.unwrap_or(self.box_size.height)
    }

    /// Validate grid geometry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ROWS).contains(&self.rows) || !(1..=MAX_COLS).contains(&self.cols) {
            return Err(ConfigError::GridSize {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if !self.origin.is_finite() {
            return Err(ConfigError::NonFinite("grid origin"));
        }

        let b = &self.box_size;
        if !(b.width.is_finite() && b.depth.is_finite() && b.height.is_finite()) {
            return Err(ConfigError::NonFinite("box size"));
        }
        if b.width <= 0.0 || b.depth <= 0.0 || b.height <= 0.0 {
            return Err(ConfigError::BoxSize);
        }

        let Spacing { dx, dy } = self.spacing;
        if !(dx.is_finite() && dy.is_finite()) {
            return Err(ConfigError::NonFinite("grid spacing"));
        }
        if dx <= 0.0 || dy <= 0.0 || dx < b.width || dy < b.depth {
            return Err(ConfigError::Spacing { dx, dy });
        }

        if let Some(h) = self.place_height {
            if !h.is_finite() {
                return Err(ConfigError::NonFinite("place height"));
            }
        }
        Ok(())
    }
}

/// How the camera mounting rotation is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationConvention {
    /// Rotation about Z only (`yaw_deg`)
    #[default]
    Yaw,
    /// Roll/pitch/yaw, applied as Rz(yaw) * Ry(pitch) * Rx(roll)
    Rpy,
    /// Explicit row-major 3x3 matrix (`matrix`)
    Matrix,
}

impl RotationConvention {
    pub const fn name(self) -> &'static str {
        match self {
            RotationConvention::Yaw => "yaw",
            RotationConvention::Rpy => "rpy",
            RotationConvention::Matrix => "matrix",
        }
    }
}

/// Sensor-to-base transform parameters
///
/// Only the parameters used by the selected convention need to be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub convention: RotationConvention,
    pub roll_deg: Option<f64>,
    pub pitch_deg: Option<f64>,
    pub yaw_deg: Option<f64>,
    /// Rows of the rotation matrix
    pub matrix: Option<[[f64; 3]; 3]>,
    /// Sensor origin expressed in the base frame (mm)
    #[serde(default)]
    pub translation: [f64; 3],
}

impl TransformConfig {
    /// Pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            convention: RotationConvention::Yaw,
            yaw_deg: Some(0.0),
            translation: [x, y, z],
            ..Self::default()
        }
    }

    /// Yaw-only mount
    pub fn yaw(yaw_deg: f64, translation: [f64; 3]) -> Self {
        Self {
            convention: RotationConvention::Yaw,
            yaw_deg: Some(yaw_deg),
            translation,
            ..Self::default()
        }
    }

    /// Roll/pitch/yaw mount
    pub fn rpy(roll_deg: f64, pitch_deg: f64, yaw_deg: f64, translation: [f64; 3]) -> Self {
        Self {
            convention: RotationConvention::Rpy,
            roll_deg: Some(roll_deg),
            pitch_deg: Some(pitch_deg),
            yaw_deg: Some(yaw_deg),
            translation,
            ..Self::default()
        }
    }

    /// Explicit matrix mount
    pub fn matrix(rows: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            convention: RotationConvention::Matrix,
            matrix: Some(rows),
            translation,
            ..Self::default()
        }
    }
}

/// Axis-aligned workspace envelope in the base frame (mm, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            min: [-1000.0, -1000.0, 0.0],
            max: [1000.0, 1000.0, 1000.0],
        }
    }
}

impl Envelope {
    /// Check whether a pose's position lies inside the envelope
    pub fn contains(&self, pose: &Pose) -> bool {
        pose.position()
            .iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .all(|(v, (lo, hi))| v.is_finite() && *lo <= *v && *v <= *hi)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .min
            .iter()
            .chain(self.max.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ConfigError::NonFinite("envelope"));
        }
        if self.min.iter().zip(self.max.iter()).any(|(lo, hi)| lo > hi) {
            return Err(ConfigError::Envelope);
        }
        Ok(())
    }
}

/// Motion limits and timing, fixed at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Cruise speed for pick/place moves (mm/s, 0 < speed <= 100)
    pub speed: f64,
    /// Speed used while homing
    pub home_speed: f64,
    /// Height of approach/retract waypoints above the target (mm)
    pub clearance_mm: f64,
    /// Ticks without position progress before a step times out
    pub max_stall_ticks: u32,
    /// Ticks the gripper must report the requested state before moving on
    pub gripper_settle_ticks: u32,
    /// Reachable workspace
    pub envelope: Envelope,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 50.0,
            home_speed: 25.0,
            clearance_mm: MIN_CLEARANCE_MM,
            max_stall_ticks: 200,
            gripper_settle_ticks: 2,
            envelope: Envelope::default(),
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for speed in [self.speed, self.home_speed] {
            if !speed.is_finite() || speed <= 0.0 || speed > MAX_SPEED {
                return Err(ConfigError::Speed(speed));
            }
        }
        if !self.clearance_mm.is_finite() || self.clearance_mm < MIN_CLEARANCE_MM {
            return Err(ConfigError::Clearance(self.clearance_mm));
        }
        if self.gripper_settle_ticks >= self.max_stall_ticks {
            return Err(ConfigError::SettleTicks {
                settle: self.gripper_settle_ticks,
                stall: self.max_stall_ticks,
            });
        }
        self.envelope.validate()
    }
}

/// Complete cell configuration, persisted as the active profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    /// Safe home pose
    pub home: Pose,
    /// Fixed pick station used when no detection is queued
    pub pick: Pose,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            transform: TransformConfig::translation(500.0, 300.0, 800.0),
            home: Pose::new(0.0, 0.0, 400.0),
            pick: Pose::new(-300.0, 0.0, 50.0),
        }
    }
}

impl CellConfig {
    /// Validate everything that does not depend on the envelope
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        if !self.home.is_finite() {
            return Err(ConfigError::NonFinite("home pose"));
        }
        if !self.pick.is_finite() {
            return Err(ConfigError::NonFinite("pick pose"));
        }
        crate::geometry::FrameTransform::from_config(&self.transform)?;
        Ok(())
    }
}
