//! Pose value type
//!
//! A pose carries a position in millimetres and an orientation as
//! roll/pitch/yaw in degrees. Poses are compared with a tolerance only,
//! never with exact equality.

use serde::{Deserialize, Serialize};

/// Default comparison tolerance (mm for position, degrees for orientation)
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Position and orientation in a Cartesian frame
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    /// X position (mm)
    pub x: f64,
    /// Y position (mm)
    pub y: f64,
    /// Z position (mm)
    pub z: f64,
    /// Rotation about X (degrees)
    pub roll: f64,
    /// Rotation about Y (degrees)
    pub pitch: f64,
    /// Rotation about Z (degrees)
    pub yaw: f64,
}

impl Pose {
    /// Create a pose at a position with zero orientation
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    /// Replace the orientation
    pub const fn with_orientation(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.roll = roll;
        self.pitch = pitch;
        self.yaw = yaw;
        self
    }

    /// Replace the yaw only
    pub const fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = yaw;
        self
    }

    /// Position as an array
    pub const fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Same pose shifted along Z by `dz` millimetres
    pub fn raised(&self, dz: f64) -> Self {
        Self {
            z: self.z + dz,
            ..*self
        }
    }

    /// Check that every component is a finite number
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Euclidean distance between the positions of two poses
    pub fn distance_to(&self, other: &Pose) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Compare two poses within `tol`
    ///
    /// Angles are compared modulo 360 degrees, so 180 and -180 match.
    pub fn approx_eq(&self, other: &Pose, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol
            && (self.y - other.y).abs() <= tol
            && (self.z - other.z).abs() <= tol
            && angle_delta(self.roll, other.roll).abs() <= tol
            && angle_delta(self.pitch, other.pitch).abs() <= tol
            && angle_delta(self.yaw, other.yaw).abs() <= tol
    }
}

/// Signed difference `a - b` wrapped into [-180, 180)
fn angle_delta(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raised_keeps_orientation() {
        let p = Pose::new(10.0, 20.0, 30.0).with_yaw(45.0);
        let up = p.raised(50.0);
        assert_eq!(up.z, 80.0);
        assert_eq!(up.x, 10.0);
        assert_eq!(up.yaw, 45.0);
    }

    #[test]
    fn test_approx_eq_tolerance() {
        let a = Pose::new(1.0, 2.0, 3.0);
        let b = Pose::new(1.0 + 1e-9, 2.0, 3.0 - 1e-9);
        assert!(a.approx_eq(&b, DEFAULT_TOLERANCE));
        assert!(!a.approx_eq(&Pose::new(1.1, 2.0, 3.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_approx_eq_wraps_angles() {
        let a = Pose::new(0.0, 0.0, 0.0).with_yaw(180.0);
        let b = Pose::new(0.0, 0.0, 0.0).with_yaw(-180.0);
        assert!(a.approx_eq(&b, DEFAULT_TOLERANCE));

        let c = Pose::new(0.0, 0.0, 0.0).with_yaw(359.5);
        let d = Pose::new(0.0, 0.0, 0.0).with_yaw(-0.5);
        assert!(c.approx_eq(&d, 1e-9));
    }

    #[test]
    fn test_distance() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_is_finite() {
        assert!(Pose::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Pose::new(f64::NAN, 2.0, 3.0).is_finite());
        assert!(!Pose::new(0.0, 0.0, 0.0).with_yaw(f64::INFINITY).is_finite());
    }
}
