//! Embassy async loops
//!
//! Each loop runs independently and communicates via channels/signals.

pub mod control;
pub mod tick;

pub use control::control_loop;
pub use tick::tick_loop;
