//! Pick/place sequencer
//!
//! Drives the actuator through home, pick, place, repeat, and reports
//! progress as [`OperationStatus`] snapshots.

pub mod error;
pub mod executor;
pub mod status;

pub use error::SequenceError;
pub use executor::{Sequencer, MAX_DETECTIONS};
pub use status::{FaultDetail, OperationStatus};
