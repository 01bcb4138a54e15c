//! Frame encoding and decoding for the command link.
//!
//! Frame format:
//! - START (1 byte): 0xA5 synchronization byte
//! - LENGTH (2 bytes, little-endian): payload length (0-8192)
//! - TYPE (1 byte): message type identifier
//! - PAYLOAD (0-8192 bytes): postcard-encoded message body
//! - CRC (2 bytes, little-endian): CRC-16/CCITT over LENGTH, TYPE and PAYLOAD

use heapless::Vec;
use thiserror::Error;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xA5;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 8192;

/// Bytes around the payload (START + LENGTH + TYPE + CRC)
pub const FRAME_OVERHEAD: usize = 1 + 2 + 1 + 2;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + MAX_PAYLOAD_SIZE;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    #[error("payload exceeds 8192 bytes")]
    PayloadTooLarge,
    /// CRC mismatch
    #[error("frame CRC mismatch")]
    InvalidCrc,
    /// Unknown message type
    #[error("unknown message type 0x{0:02X}")]
    UnknownType(u8),
    /// Payload does not decode as the message type
    #[error("malformed payload")]
    InvalidPayload,
    /// Buffer too small for encoding
    #[error("buffer too small")]
    BufferTooSmall,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type identifier
    pub msg_type: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given message type and payload
    pub fn new(msg_type: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            msg_type,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(msg_type: u8) -> Self {
        Self {
            msg_type,
            payload: Vec::new(),
        }
    }

    /// CRC over the header fields and payload
    fn calculate_crc(length: u16, msg_type: u8, payload: &[u8]) -> u16 {
        let crc = crc16_update(0xFFFF, &length.to_le_bytes());
        let crc = crc16_update(crc, &[msg_type]);
        crc16_update(crc, payload)
    }

    /// Encoded size of this frame
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let length = self.payload.len() as u16;
        let crc = Self::calculate_crc(length, self.msg_type, &self.payload);
        let end = 4 + self.payload.len();

        buffer[0] = FRAME_START;
        buffer[1..3].copy_from_slice(&length.to_le_bytes());
        buffer[3] = self.msg_type;
        buffer[4..end].copy_from_slice(&self.payload);
        buffer[end..end + 2].copy_from_slice(&crc.to_le_bytes());

        Ok(frame_len)
    }

    /// Encode this frame into a newly allocated buffer
    pub fn encode_to_vec(&self) -> std::vec::Vec<u8> {
        let mut buffer = vec![0u8; self.encoded_len()];
        // Sized exactly above, so encoding cannot run short
        let _ = self.encode(&mut buffer);
        buffer
    }
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    expected_length: u16,
    msg_type: u8,
    crc_low: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for START byte
    WaitingForStart,
    /// Got START, waiting for LENGTH low byte
    WaitingForLengthLow,
    /// Waiting for LENGTH high byte
    WaitingForLengthHigh,
    /// Got LENGTH, waiting for TYPE
    WaitingForType,
    /// Reading payload bytes
    ReadingPayload,
    /// Waiting for CRC low byte
    WaitingForCrcLow,
    /// Waiting for CRC high byte
    WaitingForCrcHigh,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForStart,
            buffer: Vec::new(),
            expected_length: 0,
            msg_type: 0,
            crc_low: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForStart;
        self.buffer.clear();
        self.expected_length = 0;
        self.msg_type = 0;
        self.crc_low = 0;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    /// After an error the parser hunts for the next START byte.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitingForStart => {
                if byte == FRAME_START {
                    self.state = ParseState::WaitingForLengthLow;
                }
                // Silently ignore non-START bytes while waiting
                Ok(None)
            }
            ParseState::WaitingForLengthLow => {
                self.expected_length = byte as u16;
                self.state = ParseState::WaitingForLengthHigh;
                Ok(None)
            }
            ParseState::WaitingForLengthHigh => {
                self.expected_length |= (byte as u16) << 8;
                if self.expected_length as usize > MAX_PAYLOAD_SIZE {
                    self.reset();
                    return Err(FrameError::PayloadTooLarge);
                }
                self.state = ParseState::WaitingForType;
                Ok(None)
            }
            ParseState::WaitingForType => {
                self.msg_type = byte;
                self.buffer.clear();
                self.state = if self.expected_length == 0 {
                    ParseState::WaitingForCrcLow
                } else {
                    ParseState::ReadingPayload
                };
                Ok(None)
            }
            ParseState::ReadingPayload => {
                // Length was bounded above, so this cannot overflow
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_length as usize {
                    self.state = ParseState::WaitingForCrcLow;
                }
                Ok(None)
            }
            ParseState::WaitingForCrcLow => {
                self.crc_low = byte;
                self.state = ParseState::WaitingForCrcHigh;
                Ok(None)
            }
            ParseState::WaitingForCrcHigh => {
                let received = u16::from_le_bytes([self.crc_low, byte]);
                let expected = Frame::calculate_crc(self.expected_length, self.msg_type, &self.buffer);

                if received != expected {
                    self.reset();
                    return Err(FrameError::InvalidCrc);
                }

                let frame = Frame {
                    msg_type: self.msg_type,
                    payload: self.buffer.clone(),
                };

                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

/// CRC-16/CCITT update (polynomial 0x1021, MSB first)
fn crc16_update(crc: u16, data: &[u8]) -> u16 {
    const POLY: u16 = 0x1021;
    let mut crc = crc;

    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}
