//! Motion watchdog
//!
//! Counts consecutive ticks in which the actuator position did not move.
//! A step that makes no progress for `max_stall_ticks` ticks times out.

use crate::geometry::Pose;

/// Minimum position change that counts as progress (mm)
pub const PROGRESS_EPSILON_MM: f64 = 1e-3;

/// Watchdog status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// Progressing, or still within the window
    Ok,
    /// No progress for the given number of ticks
    Timeout { stalled_ticks: u32 },
}

/// Stall watchdog for a single in-flight step
#[derive(Debug, Clone)]
pub struct MotionWatchdog {
    max_stall_ticks: u32,
    stalled_ticks: u32,
    last_position: Option<Pose>,
}

impl MotionWatchdog {
    pub fn new(max_stall_ticks: u32) -> Self {
        Self {
            max_stall_ticks,
            stalled_ticks: 0,
            last_position: None,
        }
    }

    /// Forget the previous step
    pub fn reset(&mut self) {
        self.stalled_ticks = 0;
        self.last_position = None;
    }

    /// Record the position seen on this tick
    pub fn observe(&mut self, position: &Pose) -> WatchdogStatus {
        match self.last_position {
            Some(last) if last.distance_to(position) > PROGRESS_EPSILON_MM => {
                self.stalled_ticks = 0;
            }
            Some(_) => {
                self.stalled_ticks = self.stalled_ticks.saturating_add(1);
            }
            None => {}
        }
        self.last_position = Some(*position);
        self.check()
    }

    pub fn check(&self) -> WatchdogStatus {
        if self.stalled_ticks >= self.max_stall_ticks {
            WatchdogStatus::Timeout {
                stalled_ticks: self.stalled_ticks,
            }
        } else {
            WatchdogStatus::Ok
        }
    }
}
