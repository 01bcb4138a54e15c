//! Palletron - pick-and-place cell controller
//!
//! Host runtime for a palletizing cell: loads the cell profile, drives the
//! sequencer from a fixed-rate tick and serves the command link over TCP.
//! The actuator is the simulated gantry from palletron-drivers.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use palletron_core::sequencer::Sequencer;
use palletron_drivers::sim::SimGantry;

use crate::config::{load_config, LoadedConfig};
use crate::controller::Controller;
use crate::error::HostError;
use crate::storage::FileStorage;

mod channels;
mod config;
mod controller;
mod error;
mod link;
mod storage;
mod tasks;

/// Pick-and-place cell controller
#[derive(Debug, Parser)]
#[command(author, version, about = "Palletron pick-and-place cell controller")]
struct Args {
    /// TOML configuration file; the embedded default is used if omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the saved cell profile
    #[arg(long, default_value = "state")]
    state_dir: PathBuf,

    /// Command link address, overriding [link] listen
    #[arg(long)]
    listen: Option<String>,

    /// Tick period in milliseconds, overriding [runtime] tick_ms
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: Option<u64>,

    /// Skip homing at startup
    #[arg(long)]
    no_home: bool,
}

/// Everything the async loops need
struct Runtime {
    controller: Controller<SimGantry, FileStorage>,
    tick_ms: u64,
}

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let args = Args::parse();
    init_logging();

    info!("Palletron starting...");

    let runtime = match setup(&args) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    info!("Controller running");
    join(
        tasks::tick_loop(runtime.tick_ms),
        tasks::control_loop(runtime.controller),
    )
    .await;
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load configuration, build the controller and start the command link
fn setup(args: &Args) -> Result<Runtime, HostError> {
    let mut storage = FileStorage::open(&args.state_dir)?;
    info!("State directory: {}", storage.dir().display());

    let LoadedConfig { mut host, source } = load_config(args.config.as_deref(), &mut storage)?;
    if let Some(listen) = &args.listen {
        host.link.listen = listen.clone();
    }
    if let Some(tick_ms) = args.tick_ms {
        host.runtime.tick_ms = tick_ms;
    }

    let gantry = SimGantry::new(host.simulator);
    let sequencer = Sequencer::new(gantry, host.motion.clone())?;
    info!(
        "Simulated gantry ready, speed {} mm/s, envelope {:?}..{:?}",
        host.motion.speed, host.motion.envelope.min, host.motion.envelope.max
    );

    let mut controller = Controller::new(sequencer, storage);
    info!("Applying cell profile from {}", source);
    controller.boot(host.cell, host.runtime.home_on_start && !args.no_home);

    let listener = TcpListener::bind(&host.link.listen).map_err(|source| HostError::Bind {
        addr: host.link.listen.clone(),
        source,
    })?;
    link::serve(listener, Duration::from_millis(host.link.reply_timeout_ms))
        .map_err(HostError::Link)?;

    Ok(Runtime {
        controller,
        tick_ms: host.runtime.tick_ms,
    })
}
