//! Configuration loading
//!
//! The host configuration comes from `--config` or the embedded default.
//! The cell profile inside it is then replaced by the stored profile, if a
//! valid one exists.

use std::fmt;
use std::fs;
use std::path::Path;

use palletron_core::config::{load_profile, ProfileError};
use palletron_core::traits::{Storage, StorageError};
use tracing::{debug, info, warn};

use super::toml::{parse_config, HostConfig};
use crate::error::HostError;

/// Embedded default configuration
pub const EMBEDDED_CONFIG: &str = include_str!("../../palletron.toml");

/// Where the active cell profile came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Stored,
    ConfigFile,
    Embedded,
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileSource::Stored => "stored profile",
            ProfileSource::ConfigFile => "configuration file",
            ProfileSource::Embedded => "embedded defaults",
        })
    }
}

/// Result of configuration loading
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub host: HostConfig,
    pub source: ProfileSource,
}

/// Load the host configuration and the active cell profile
pub fn load_config<S: Storage>(
    path: Option<&Path>,
    storage: &mut S,
) -> Result<LoadedConfig, HostError> {
    let (mut host, mut source) = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let text = fs::read_to_string(path).map_err(|source| HostError::ReadConfig {
                path: path.to_path_buf(),
                source,
            })?;
            (parse_config(&text)?, ProfileSource::ConfigFile)
        }
        None => {
            info!("No configuration file given, using embedded defaults");
            (parse_config(EMBEDDED_CONFIG)?, ProfileSource::Embedded)
        }
    };

    match load_profile(storage) {
        Ok(cell) => {
            host.cell = cell;
            source = ProfileSource::Stored;
        }
        Err(ProfileError::Storage(StorageError::NotFound)) => {
            debug!("No stored profile");
        }
        Err(e) => {
            warn!("Ignoring stored profile: {}", e);
        }
    }

    log_config_summary(&host, source);
    Ok(LoadedConfig { host, source })
}

fn log_config_summary(host: &HostConfig, source: ProfileSource) {
    let grid = &host.cell.grid;
    info!("Cell profile from {}", source);
    debug!(
        "  grid {}x{} ({:?}), spacing {} x {} mm",
        grid.rows, grid.cols, grid.fill_order, grid.spacing.dx, grid.spacing.dy
    );
    debug!(
        "  transform {} t={:?}",
        host.cell.transform.convention.name(),
        host.cell.transform.translation
    );
    debug!(
        "  speed {} mm/s, clearance {} mm, stall limit {} ticks",
        host.motion.speed, host.motion.clearance_mm, host.motion.max_stall_ticks
    );
}
