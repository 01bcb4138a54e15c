//! Inter-task communication channels
//!
//! Defines the static channels shared by the control loop and the command
//! link threads. Uses embassy-sync primitives; the critical-section
//! implementation for std makes them safe to touch from plain threads.

use core::cell::RefCell;
use std::sync::mpsc::Sender;
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use palletron_core::sequencer::OperationStatus;
use palletron_protocol::{Request, Response};

/// Channel capacity for link commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// A request from the command link with the sender for its reply
#[derive(Debug)]
pub struct CommandRequest {
    pub request: Request,
    pub reply: Sender<Response>,
    /// The link stops waiting for the reply at this instant
    pub deadline: Instant,
}

impl CommandRequest {
    /// True once the link has given up on this request
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Commands from link connections to the control loop
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, CommandRequest, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Tick from the ticker
pub static TICK_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Latest operation status published by the control loop
static STATUS: Mutex<CriticalSectionRawMutex, RefCell<Option<OperationStatus>>> =
    Mutex::new(RefCell::new(None));

/// Replace the published status snapshot
pub fn publish_status(status: OperationStatus) {
    STATUS.lock(|cell| *cell.borrow_mut() = Some(status));
}

/// Copy of the latest status snapshot, if the control loop has published one
pub fn latest_status() -> Option<OperationStatus> {
    STATUS.lock(|cell| cell.borrow().clone())
}
