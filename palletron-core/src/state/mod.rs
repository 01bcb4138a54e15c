//! State machine for the pick/place cycle
//!
//! The phase machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::{Event, FaultKind};
pub use machine::{Phase, PhaseView};
