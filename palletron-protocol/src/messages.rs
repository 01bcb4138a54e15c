//! Message types for the command link
//!
//! Message types are divided into two categories:
//! - Client → Controller: commands and queries
//! - Controller → Client: replies
//!
//! Every request gets exactly one response. Message bodies are postcard.

use palletron_core::config::CellConfig;
use palletron_core::geometry::Pose;
use palletron_core::sequencer::{OperationStatus, SequenceError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::frame::{Frame, FrameError};

// Message type IDs: Client → Controller
pub const MSG_CONFIGURE: u8 = 0x01;
pub const MSG_START: u8 = 0x02;
pub const MSG_STOP: u8 = 0x03;
pub const MSG_RECOVER: u8 = 0x04;
pub const MSG_HOME: u8 = 0x05;
pub const MSG_REWIND: u8 = 0x06;
pub const MSG_STATUS: u8 = 0x07;
pub const MSG_DETECT: u8 = 0x08;
pub const MSG_PLAN: u8 = 0x09;
pub const MSG_TRANSFORM: u8 = 0x0A;

// Message type IDs: Controller → Client
pub const MSG_OK: u8 = 0x80;
pub const MSG_ERROR: u8 = 0x81;
pub const MSG_STATUS_REPLY: u8 = 0x82;
pub const MSG_PLAN_REPLY: u8 = 0x83;
pub const MSG_TRANSFORMED: u8 = 0x84;
pub const MSG_BUSY: u8 = 0x85;

/// Error categories carried in error replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidConfiguration,
    UnreachableTarget,
    AlreadyRunning,
    InvalidState,
    ActuatorFault,
    PlanComplete,
    DetectionQueueFull,
    /// Request frame could not be decoded
    MalformedRequest,
    /// Controller did not answer in time
    Timeout,
}

impl From<&SequenceError> for ErrorCode {
    fn from(error: &SequenceError) -> Self {
        match error {
            SequenceError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            SequenceError::UnreachableTarget(_) => ErrorCode::UnreachableTarget,
            SequenceError::AlreadyRunning => ErrorCode::AlreadyRunning,
            SequenceError::InvalidState { .. } => ErrorCode::InvalidState,
            SequenceError::ActuatorFault(_) => ErrorCode::ActuatorFault,
            SequenceError::PlanComplete => ErrorCode::PlanComplete,
            SequenceError::DetectionQueueFull => ErrorCode::DetectionQueueFull,
        }
    }
}

/// Requests from a client
#[derive(Debug, Clone)]
pub enum Request {
    /// Replace the cell configuration
    Configure(CellConfig),
    Start,
    Stop,
    Recover,
    Home,
    /// Restart the plan at target 0
    Rewind,
    Status,
    /// Queue a sensor-frame detection
    Detect(Pose),
    /// Fetch the full placement plan
    Plan,
    /// Transform a sensor-frame pose without queueing it
    Transform(Pose),
}

impl Request {
    /// Message type identifier
    pub fn msg_type(&self) -> u8 {
        match self {
            Request::Configure(_) => MSG_CONFIGURE,
            Request::Start => MSG_START,
            Request::Stop => MSG_STOP,
            Request::Recover => MSG_RECOVER,
            Request::Home => MSG_HOME,
            Request::Rewind => MSG_REWIND,
            Request::Status => MSG_STATUS,
            Request::Detect(_) => MSG_DETECT,
            Request::Plan => MSG_PLAN,
            Request::Transform(_) => MSG_TRANSFORM,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Request::Configure(_) => "configure",
            Request::Start => "start",
            Request::Stop => "stop",
            Request::Recover => "recover",
            Request::Home => "home",
            Request::Rewind => "rewind",
            Request::Status => "status",
            Request::Detect(_) => "detect",
            Request::Plan => "plan",
            Request::Transform(_) => "transform",
        }
    }

    /// Encode this request into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            Request::Configure(cell) => encode(MSG_CONFIGURE, cell),
            Request::Detect(pose) | Request::Transform(pose) => encode(self.msg_type(), pose),
            _ => Ok(Frame::empty(self.msg_type())),
        }
    }

    /// Parse a request from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.msg_type {
            MSG_CONFIGURE => Ok(Request::Configure(decode(frame)?)),
            MSG_START => Ok(Request::Start),
            MSG_STOP => Ok(Request::Stop),
            MSG_RECOVER => Ok(Request::Recover),
            MSG_HOME => Ok(Request::Home),
            MSG_REWIND => Ok(Request::Rewind),
            MSG_STATUS => Ok(Request::Status),
            MSG_DETECT => Ok(Request::Detect(decode(frame)?)),
            MSG_PLAN => Ok(Request::Plan),
            MSG_TRANSFORM => Ok(Request::Transform(decode(frame)?)),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// Replies from the controller
#[derive(Debug, Clone)]
pub enum Response {
    /// Command accepted
    Ok,
    /// Command rejected
    Error { code: ErrorCode, detail: String },
    Status(OperationStatus),
    Plan(Vec<Pose>),
    Transformed { sensor: Pose, base: Pose },
    /// Controller queue full; retry later
    Busy,
}

impl Response {
    /// Error reply for a sequencer error
    pub fn error(error: &SequenceError) -> Self {
        Response::Error {
            code: error.into(),
            detail: error.to_string(),
        }
    }

    /// Ok or error reply for a command result
    pub fn from_result(result: Result<(), SequenceError>) -> Self {
        match result {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(&e),
        }
    }

    /// Encode this response into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            Response::Ok => Ok(Frame::empty(MSG_OK)),
            Response::Error { code, detail } => encode(MSG_ERROR, &(code, detail)),
            Response::Status(status) => encode(MSG_STATUS_REPLY, status),
            Response::Plan(targets) => encode(MSG_PLAN_REPLY, targets),
            Response::Transformed { sensor, base } => encode(MSG_TRANSFORMED, &(sensor, base)),
            Response::Busy => Ok(Frame::empty(MSG_BUSY)),
        }
    }

    /// Parse a response from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.msg_type {
            MSG_OK => Ok(Response::Ok),
            MSG_ERROR => {
                let (code, detail) = decode(frame)?;
                Ok(Response::Error { code, detail })
            }
            MSG_STATUS_REPLY => Ok(Response::Status(decode(frame)?)),
            MSG_PLAN_REPLY => Ok(Response::Plan(decode(frame)?)),
            MSG_TRANSFORMED => {
                let (sensor, base) = decode(frame)?;
                Ok(Response::Transformed { sensor, base })
            }
            MSG_BUSY => Ok(Response::Busy),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

fn encode<T: Serialize + ?Sized>(msg_type: u8, body: &T) -> Result<Frame, FrameError> {
    let bytes = postcard::to_allocvec(body).map_err(|_| FrameError::InvalidPayload)?;
    Frame::new(msg_type, &bytes)
}

fn decode<T: DeserializeOwned>(frame: &Frame) -> Result<T, FrameError> {
    postcard::from_bytes(&frame.payload).map_err(|_| FrameError::InvalidPayload)
}
