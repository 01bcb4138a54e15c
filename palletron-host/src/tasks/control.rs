//! Control loop
//!
//! Waits for either a link command or a tick, hands it to the controller
//! and publishes the resulting status snapshot. Commands the link has
//! already timed out on are dropped without being applied.

use embassy_futures::select::{select, Either};
use palletron_core::traits::{Actuator, Storage};
use tracing::{debug, info, warn};

use crate::channels::{publish_status, CommandRequest, COMMAND_CHANNEL, TICK_SIGNAL};
use crate::controller::Controller;

/// Main coordination loop
pub async fn control_loop<A: Actuator, S: Storage>(mut controller: Controller<A, S>) {
    info!("Control loop started");
    publish_status(controller.status());

    loop {
        match select(COMMAND_CHANNEL.receive(), TICK_SIGNAL.wait()).await {
            Either::First(command) => serve_command(&mut controller, command),
            Either::Second(()) => {
                controller.tick();
            }
        }

        publish_status(controller.status());
    }
}

fn serve_command<A: Actuator, S: Storage>(controller: &mut Controller<A, S>, command: CommandRequest) {
    if command.is_expired() {
        warn!("Dropping {} request: link reply timeout passed", command.request.name());
        return;
    }

    let response = controller.handle(command.request);
    if command.reply.send(response).is_err() {
        debug!("Link connection went away before the reply");
    }
}
