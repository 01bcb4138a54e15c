//! Actuator implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in palletron-core:
//!
//! - Simulated three-axis gantry with a parallel gripper

#![deny(unsafe_code)]

pub mod sim;
