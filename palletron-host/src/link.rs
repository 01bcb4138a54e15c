//! Command link server
//!
//! Accepts TCP connections and serves each one on its own thread. Every
//! request frame gets exactly one response frame. Status requests are
//! answered from the published snapshot; everything else is forwarded to
//! the control loop through the bounded command channel.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use palletron_protocol::{ErrorCode, Frame, FrameParser, Request, Response};
use tracing::{debug, info, warn};

use crate::channels::{latest_status, CommandRequest, COMMAND_CHANNEL};

/// Read buffer size per connection
const READ_BUFFER_SIZE: usize = 1024;

/// Start the accept loop on a background thread
pub fn serve(listener: TcpListener, reply_timeout: Duration) -> io::Result<JoinHandle<()>> {
    let addr = listener.local_addr()?;
    info!("Command link listening on {}", addr);

    thread::Builder::new()
        .name("link-accept".into())
        .spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => spawn_connection(stream, reply_timeout),
                    Err(e) => warn!("Accept failed: {}", e),
                }
            }
        })
}

fn spawn_connection(stream: TcpStream, reply_timeout: Duration) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());
    info!("Client connected: {}", peer);

    let spawned = thread::Builder::new()
        .name(format!("link-{peer}"))
        .spawn(move || {
            match serve_connection(stream, reply_timeout) {
                Ok(()) => info!("Client disconnected: {}", peer),
                Err(e) => warn!("Connection {} closed: {}", peer, e),
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start connection thread: {}", e);
    }
}

/// Serve one connection until the peer closes it
fn serve_connection(mut stream: TcpStream, reply_timeout: Duration) -> io::Result<()> {
    let mut parser = FrameParser::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = stream.read(&mut buffer)?;
        if n == 0 {
            return Ok(());
        }

        for &byte in &buffer[..n] {
            let response = match parser.feed(byte) {
                Ok(Some(frame)) => dispatch(&frame, reply_timeout),
                Ok(None) => continue,
                Err(e) => {
                    debug!("Frame error: {}", e);
                    malformed(e.to_string())
                }
            };
            write_response(&mut stream, &response)?;
        }
    }
}

/// Turn a request frame into a response
fn dispatch(frame: &Frame, reply_timeout: Duration) -> Response {
    let request = match Request::from_frame(frame) {
        Ok(request) => request,
        Err(e) => return malformed(e.to_string()),
    };

    if let Request::Status = request {
        if let Some(status) = latest_status() {
            return Response::Status(status);
        }
    }

    let (reply, response) = mpsc::channel();
    let command = CommandRequest {
        request,
        reply,
        deadline: Instant::now() + reply_timeout,
    };
    if COMMAND_CHANNEL.try_send(command).is_err() {
        return Response::Busy;
    }

    match response.recv_timeout(reply_timeout) {
        Ok(response) => response,
        Err(_) => Response::Error {
            code: ErrorCode::Timeout,
            detail: "controller did not reply in time; request dropped".into(),
        },
    }
}

fn malformed(detail: String) -> Response {
    Response::Error {
        code: ErrorCode::MalformedRequest,
        detail,
    }
}

fn write_response(stream: &mut TcpStream, response: &Response) -> io::Result<()> {
    let frame = match response.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Failed to encode response: {}", e);
            malformed(e.to_string())
                .to_frame()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        }
    };
    stream.write_all(&frame.encode_to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::publish_status;
    use palletron_core::geometry::Pose;
    use palletron_core::sequencer::OperationStatus;
    use palletron_core::state::{Phase, PhaseView};
    use palletron_core::traits::GripperState;
    use palletron_protocol::messages::MSG_DETECT;

    fn read_response(stream: &mut TcpStream) -> Response {
        let mut parser = FrameParser::new();
        let mut byte = [0u8; 1];
        loop {
            stream.read_exact(&mut byte).unwrap();
            if let Some(frame) = parser.feed(byte[0]).unwrap() {
                return Response::from_frame(&frame).unwrap();
            }
        }
    }

    fn connect() -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        serve(listener, Duration::from_millis(100)).unwrap();
        TcpStream::connect(addr).unwrap()
    }

    #[test]
    fn test_malformed_payload_gets_error_reply() {
        let mut stream = connect();
        let frame = Frame::new(MSG_DETECT, &[0xFF]).unwrap();
        stream.write_all(&frame.encode_to_vec()).unwrap();

        match read_response(&mut stream) {
            Response::Error { code, .. } => assert_eq!(code, ErrorCode::MalformedRequest),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_bad_crc_gets_error_reply() {
        let mut stream = connect();
        let mut bytes = Request::Start.to_frame().unwrap().encode_to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        stream.write_all(&bytes).unwrap();

        match read_response(&mut stream) {
            Response::Error { code, .. } => assert_eq!(code, ErrorCode::MalformedRequest),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_status_from_snapshot() {
        publish_status(OperationStatus {
            phase: Phase::Idle,
            view: PhaseView::Idle,
            target_index: 0,
            total_targets: 4,
            position: Pose::new(0.0, 0.0, 400.0),
            gripper: GripperState::Open,
            fault: None,
            pending_detections: 0,
            stopping: false,
        });

        let mut stream = connect();
        let frame = Request::Status.to_frame().unwrap();
        stream.write_all(&frame.encode_to_vec()).unwrap();

        match read_response(&mut stream) {
            Response::Status(status) => assert_eq!(status.total_targets, 4),
            other => panic!("unexpected response {other:?}"),
        }
    }
}
