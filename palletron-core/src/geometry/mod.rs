//! Poses and frame transforms
//!
//! Positions are millimetres, orientations are degrees (roll, pitch, yaw).

pub mod pose;
pub mod transform;

pub use pose::{Pose, DEFAULT_TOLERANCE};
pub use transform::{FrameTransform, ORTHONORMAL_TOLERANCE};
