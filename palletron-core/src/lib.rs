//! Actuator-agnostic core logic for the palletizing cell
//!
//! This crate contains all application logic that does not depend on
//! a specific actuator or transport:
//!
//! - Pose type and the sensor-to-base frame transform
//! - Grid planner (placement plan, approach/retract waypoints)
//! - Phase state machine for the pick/place cycle
//! - Sequencer driving a single actuator tick by tick
//! - Motion watchdog
//! - Actuator and storage traits
//! - Configuration and persisted profile types

#![deny(unsafe_code)]

pub mod config;
pub mod geometry;
pub mod planner;
pub mod safety;
pub mod sequencer;
pub mod state;
pub mod traits;
