//! Safety monitoring
//!
//! Detects stalled steps so the sequencer can latch a timeout fault.

pub mod watchdog;

pub use watchdog::{MotionWatchdog, WatchdogStatus, PROGRESS_EPSILON_MM};
