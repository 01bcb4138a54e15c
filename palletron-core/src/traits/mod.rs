//! Hardware abstraction traits
//!
//! These traits define the interface between the sequencing logic and
//! the concrete actuator and storage implementations.

pub mod actuator;
pub mod storage;

pub use actuator::{Actuator, ActuatorError, ActuatorStatus, GripperState, MotionReport};
pub use storage::{MemoryStorage, Storage, StorageError, StorageKey};
