//! Startup errors

use std::io;
use std::path::PathBuf;

use palletron_core::config::ConfigError;
use palletron_core::traits::StorageError;
use thiserror::Error;

/// Errors that stop the host from starting
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to read {}: {source}", .path.display())]
    ReadConfig { path: PathBuf, source: io::Error },

    #[error("invalid configuration file: {0}")]
    ParseConfig(#[from] toml::de::Error),

    #[error("invalid motion settings: {0}")]
    Motion(#[from] ConfigError),

    #[error("state directory unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to listen on {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("failed to start command link: {0}")]
    Link(#[source] io::Error),
}
