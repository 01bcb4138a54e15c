//! Palletron Command Link Protocol
//!
//! Framed binary protocol between an operator client (or a vision process)
//! and the cell controller, carried over TCP.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ LENGTH │ TYPE │ PAYLOAD     │ CRC16    │
//! │ 1B    │ 2B LE  │ 1B   │ 0–8192B     │ 2B LE    │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! Payloads are postcard-encoded. The client sends one request frame and
//! reads exactly one response frame.

#![deny(unsafe_code)]

pub mod frame;
pub mod messages;

pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{ErrorCode, Request, Response};
