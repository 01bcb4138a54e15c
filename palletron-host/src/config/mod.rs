//! Configuration loading and parsing
//!
//! Loads the host configuration from a TOML file or the embedded default,
//! with the stored cell profile taking precedence.

pub mod loader;
pub mod toml;

pub use loader::{load_config, LoadedConfig};
pub use self::toml::cell_to_toml;
