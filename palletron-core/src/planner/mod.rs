//! Placement planning
//!
//! Grid targets and approach/retract waypoints, gated by the workspace
//! envelope.

pub mod grid;

pub use grid::{GridPlanner, PlacementPlan, PlanError};
