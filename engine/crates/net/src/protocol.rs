use std::sync::Arc;

use crate::connection::Connection;
use crate::error::ProtocolError;

/// Size of the fixed frame header: `opcode: u16` + `payload_len: u32`, little-endian.
pub const HEADER_LEN: usize = 6;

/// Default upper bound on a single frame's payload.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Packet opcodes. Dense and bounded so dispatch tables can index by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Opcode {
    Invalid = 0,
    ClientLogonChallenge = 1,
    ServerLogonChallenge = 2,
    ClientLogonProof = 3,
    ServerLogonProof = 4,
    ClientPing = 5,
    ServerPong = 6,
    ClientChatMessage = 7,
    InternalHandshake = 8,
    InternalHandshakeResponse = 9,
    InternalPing = 10,
    InternalPong = 11,
}

impl Opcode {
    /// Number of opcode slots; one past the highest discriminant.
    pub const COUNT: usize = 12;

    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0 => Self::Invalid,
            1 => Self::ClientLogonChallenge,
            2 => Self::ServerLogonChallenge,
            3 => Self::ClientLogonProof,
            4 => Self::ServerLogonProof,
            5 => Self::ClientPing,
            6 => Self::ServerPong,
            7 => Self::ClientChatMessage,
            8 => Self::InternalHandshake,
            9 => Self::InternalHandshakeResponse,
            10 => Self::InternalPing,
            11 => Self::InternalPong,
            _ => return None,
        })
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Slot of this opcode in a dispatch table.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(0x{:04x})", self, self.as_u16())
    }
}

/// Fixed packet header: what it is and where it came from.
#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub opcode: Opcode,
    pub connection: Arc<Connection>,
}

/// An owned inbound packet.
///
/// Not `Clone`: a packet has exactly one owner at a time, moving
/// from the I/O layer into a session queue and from there to a handler.
#[derive(Debug)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(opcode: Opcode, connection: Arc<Connection>, payload: Vec<u8>) -> Self {
        Self {
            header: PacketHeader { opcode, connection },
            payload,
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.header.opcode
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.header.connection
    }
}

/// Encode one frame: header followed by the payload.
pub fn encode_frame(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&opcode.as_u16().to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Accumulates raw stream bytes and splits them into complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_payload: usize,
}

impl FrameBuffer {
    pub fn new(max_payload: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_payload,
        }
    }

    /// Feed bytes and return every frame completed by them.
    ///
    /// Validation happens as soon as a header is complete, so an oversized
    /// or unknown frame is rejected before its payload is buffered.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<(Opcode, Vec<u8>)>, ProtocolError> {
        self.buf.extend_from_slice(data);
        let mut frames = Vec::new();

        loop {
            if self.buf.len() < HEADER_LEN {
                break;
            }
            let raw_opcode = u16::from_le_bytes([self.buf[0], self.buf[1]]);
            let len = u32::from_le_bytes([self.buf[2], self.buf[3], self.buf[4], self.buf[5]]) as usize;

            let opcode = match Opcode::from_u16(raw_opcode) {
                Some(Opcode::Invalid) | None => return Err(ProtocolError::UnknownOpcode(raw_opcode)),
                Some(op) => op,
            };
            if len > self.max_payload {
                return Err(ProtocolError::PayloadTooLarge {
                    len,
                    max: self.max_payload,
                });
            }
            if self.buf.len() < HEADER_LEN + len {
                break;
            }

            let payload = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
            self.buf.drain(..HEADER_LEN + len);
            frames.push((opcode, payload));
        }

        Ok(frames)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
