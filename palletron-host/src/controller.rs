//! Cell controller
//!
//! Owns the sequencer and the profile storage. Link requests are answered
//! here, ticks are forwarded to the sequencer and every phase change is
//! logged.

use palletron_core::config::{save_profile, CellConfig};
use palletron_core::geometry::Pose;
use palletron_core::sequencer::{OperationStatus, SequenceError, Sequencer};
use palletron_core::state::{Event, Phase};
use palletron_core::traits::{Actuator, Storage, StorageKey};
use palletron_protocol::{Request, Response};
use tracing::{debug, error, info, trace, warn};

use crate::config::cell_to_toml;

/// Coordinates the sequencer with persistence and logging
pub struct Controller<A: Actuator, S: Storage> {
    sequencer: Sequencer<A>,
    storage: S,
    last_phase: Phase,
}

impl<A: Actuator, S: Storage> Controller<A, S> {
    pub fn new(sequencer: Sequencer<A>, storage: S) -> Self {
        let last_phase = sequencer.phase();
        Self {
            sequencer,
            storage,
            last_phase,
        }
    }

    /// Apply the startup profile and optionally start homing
    ///
    /// A profile that does not fit the envelope leaves the cell
    /// unconfigured; the operator can send a new one over the link.
    pub fn boot(&mut self, cell: CellConfig, home: bool) {
        match self.sequencer.configure(cell) {
            Ok(()) => info!(
                "Cell configured: {} targets",
                self.sequencer.total_targets()
            ),
            Err(e) => warn!("Startup profile rejected: {}", e),
        }

        if home {
            match self.sequencer.home() {
                Ok(()) => info!("Homing"),
                Err(e) => warn!("Startup homing refused: {}", e),
            }
        }
        self.note_phase(None);
    }

    pub fn status(&self) -> OperationStatus {
        self.sequencer.status()
    }

    /// Handle one link request
    pub fn handle(&mut self, request: Request) -> Response {
        let name = request.name();
        debug!("Request: {}", name);

        let response = match request {
            Request::Configure(cell) => self.configure(cell),
            Request::Start => Response::from_result(self.sequencer.start()),
            Request::Stop => Response::from_result(self.sequencer.stop()),
            Request::Recover => Response::from_result(self.sequencer.recover()),
            Request::Home => Response::from_result(self.sequencer.home()),
            Request::Rewind => Response::from_result(self.sequencer.rewind()),
            Request::Status => Response::Status(self.sequencer.status()),
            Request::Detect(sensor) => {
                let result = self.sequencer.submit_detection(&sensor);
                transformed(sensor, result)
            }
            Request::Transform(sensor) => {
                let result = self.sequencer.transform_detection(&sensor);
                transformed(sensor, result)
            }
            Request::Plan => match self.sequencer.plan() {
                Ok(plan) => Response::Plan(plan.as_slice().to_vec()),
                Err(e) => Response::error(&e),
            },
        };

        if let Response::Error { detail, .. } = &response {
            warn!("{} rejected: {}", name, detail);
        }
        self.note_phase(None);
        response
    }

    /// Advance the sequencer by one tick
    pub fn tick(&mut self) -> Option<Event> {
        let event = self.sequencer.tick();
        trace!("tick in {}", self.sequencer.phase());
        self.note_phase(event);
        event
    }

    fn configure(&mut self, cell: CellConfig) -> Response {
        match self.sequencer.configure(cell.clone()) {
            Ok(()) => {
                info!(
                    "Cell configured: {} targets",
                    self.sequencer.total_targets()
                );
                self.persist(&cell);
                Response::Ok
            }
            Err(e) => Response::error(&e),
        }
    }

    /// Save the accepted profile; failures are logged, not reported
    fn persist(&mut self, cell: &CellConfig) {
        if let Err(e) = save_profile(&mut self.storage, cell) {
            error!("Failed to save profile: {}", e);
            return;
        }
        match cell_to_toml(cell) {
            Ok(text) => {
                if let Err(e) = self.storage.write(StorageKey::ProfileToml, text.as_bytes()) {
                    warn!("Failed to save profile TOML: {}", e);
                }
            }
            Err(e) => warn!("Failed to render profile TOML: {}", e),
        }
        debug!("Profile saved");
    }

    fn note_phase(&mut self, event: Option<Event>) {
        let phase = self.sequencer.phase();
        if phase == self.last_phase {
            return;
        }

        if phase == Phase::Fault {
            let status = self.sequencer.status();
            match status.fault {
                Some(fault) => error!("FAULT: {}", fault),
                None => error!("FAULT in {}", self.last_phase),
            }
        } else {
            info!(
                "{} -> {} (target {}/{})",
                self.last_phase,
                phase,
                self.sequencer.target_index(),
                self.sequencer.total_targets()
            );
        }
        if let Some(event) = event {
            debug!("Event: {:?}", event);
        }
        self.last_phase = phase;
    }
}

#[cfg(test)]
impl<A: Actuator, S: Storage> Controller<A, S> {
    fn sequencer_mut(&mut self) -> &mut Sequencer<A> {
        &mut self.sequencer
    }

    fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

fn transformed(sensor: Pose, result: Result<Pose, SequenceError>) -> Response {
    match result {
        Ok(base) => Response::Transformed { sensor, base },
        Err(e) => Response::error(&e),
    }
}
