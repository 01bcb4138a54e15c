//! Configuration types
//!
//! Cell and motion configuration, plus the persisted profile record.

pub mod profile;
pub mod types;

pub use profile::*;
pub use types::*;
