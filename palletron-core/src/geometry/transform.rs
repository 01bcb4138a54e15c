//! Sensor-to-base frame transform
//!
//! `P_base = R * P_sensor + T`. The rotation is built once from a
//! [`TransformConfig`] and the transform is immutable afterwards.

use nalgebra::{Matrix3, Rotation3, Vector3};

use super::Pose;
use crate::config::{ConfigError, RotationConvention, TransformConfig};

/// Tolerance for the orthonormality and determinant checks
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Rigid transform from the sensor frame to the actuator base frame
#[derive(Debug, Clone, Copy)]
pub struct FrameTransform {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl FrameTransform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Build a transform from configuration
    pub fn from_config(config: &TransformConfig) -> Result<Self, ConfigError> {
        let convention = config.convention.name();
        let require = |value: Option<f64>, parameter: &'static str| match value {
            Some(v) if v.is_finite() => Ok(v),
            Some(_) => Err(ConfigError::NonFinite(parameter)),
            None => Err(ConfigError::MissingRotationParameter {
                convention,
                parameter,
            }),
        };

        let rotation = match config.convention {
            RotationConvention::Yaw => {
                let yaw = require(config.yaw_deg, "yaw_deg")?;
                rotation_from_rpy(0.0, 0.0, yaw)
            }
            RotationConvention::Rpy => {
                let roll = require(config.roll_deg, "roll_deg")?;
                let pitch = require(config.pitch_deg, "pitch_deg")?;
                let yaw = require(config.yaw_deg, "yaw_deg")?;
                rotation_from_rpy(roll, pitch, yaw)
            }
            RotationConvention::Matrix => {
                let rows = config
                    .matrix
                    .ok_or(ConfigError::MissingRotationParameter {
                        convention,
                        parameter: "matrix",
                    })?;
                Matrix3::new(
                    rows[0][0], rows[0][1], rows[0][2], //
                    rows[1][0], rows[1][1], rows[1][2], //
                    rows[2][0], rows[2][1], rows[2][2],
                )
            }
        };

        let [tx, ty, tz] = config.translation;
        Self::from_parts(rotation, Vector3::new(tx, ty, tz))
    }

    /// Build a transform from a rotation matrix and translation
    ///
    /// Fails unless the matrix is orthonormal with determinant +1.
    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Result<Self, ConfigError> {
        if rotation.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite("rotation matrix"));
        }
        if translation.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite("translation"));
        }

        let gram = rotation.transpose() * rotation - Matrix3::identity();
        if gram.iter().any(|v| v.abs() > ORTHONORMAL_TOLERANCE)
            || (rotation.determinant() - 1.0).abs() > ORTHONORMAL_TOLERANCE
        {
            return Err(ConfigError::NotOrthonormal);
        }

        Ok(Self {
            rotation,
            translation,
        })
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Transform a bare point
    pub fn apply_point(&self, point: [f64; 3]) -> [f64; 3] {
        let p = self.rotation * Vector3::new(point[0], point[1], point[2]) + self.translation;
        [p.x, p.y, p.z]
    }

    /// Transform a pose
    ///
    /// The object orientation is composed with the mounting rotation, so a
    /// yaw-only mount adds its yaw to the detected yaw.
    pub fn apply(&self, pose: &Pose) -> Pose {
        let [x, y, z] = self.apply_point(pose.position());
        let object = rotation_from_rpy(pose.roll, pose.pitch, pose.yaw);
        let (roll, pitch, yaw) = Rotation3::from_matrix_unchecked(self.rotation * object).euler_angles();

        Pose::new(x, y, z).with_orientation(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    }

    /// Inverse transform (base frame to sensor frame)
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// 4x4 homogeneous matrix, row-major
    pub fn homogeneous(&self) -> [[f64; 4]; 4] {
        let r = &self.rotation;
        let t = &self.translation;
        [
            [r[(0, 0)], r[(0, 1)], r[(0, 2)], t.x],
            [r[(1, 0)], r[(1, 1)], r[(1, 2)], t.y],
            [r[(2, 0)], r[(2, 1)], r[(2, 2)], t.z],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }
}

/// `Rz(yaw) * Ry(pitch) * Rx(roll)` from angles in degrees
fn rotation_from_rpy(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    Rotation3::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians()).into_inner()
}
