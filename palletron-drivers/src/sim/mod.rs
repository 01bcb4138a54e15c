//! Simulated actuators

pub mod gantry;

pub use gantry::{SimConfig, SimGantry};
