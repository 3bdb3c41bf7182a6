//! Binary frame format.
//!
//! Frame layout (8-byte header + body):
//!
//! ```text
//! +---------+-------+--------+--------+-------------+
//! | version | flags | stream | opcode | body_length |
//! | 1 byte  |1 byte | 1 byte | 1 byte |   4 bytes   |
//! +---------+-------+--------+--------+-------------+
//! | body: body_length bytes                         |
//! +-------------------------------------------------+
//! ```

use crate::error::ProtocolError;
use crate::MAX_BODY_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the fixed frame header in bytes (1+1+1+1+4 = 8).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Frame flags bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Body is compressed; the codec itself never (de)compresses.
    pub const COMPRESSION: u8 = 0x01;
    /// Response carries a trace id before the body.
    pub const TRACING: u8 = 0x02;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with_compression(mut self) -> Self {
        self.0 |= Self::COMPRESSION;
        self
    }

    pub fn with_tracing(mut self) -> Self {
        self.0 |= Self::TRACING;
        self
    }

    pub fn is_compressed(&self) -> bool {
        self.0 & Self::COMPRESSION != 0
    }

    pub fn is_tracing(&self) -> bool {
        self.0 & Self::TRACING != 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Unknown bits are kept as-is; later protocol versions may define them.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }
}

/// Frame opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    Authenticate = 0x03,
    Options = 0x05,
    Supported = 0x06,
    Query = 0x07,
    Result = 0x08,
    Prepare = 0x09,
    Execute = 0x0A,
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Opcode::Error),
            0x01 => Some(Opcode::Startup),
            0x02 => Some(Opcode::Ready),
            0x03 => Some(Opcode::Authenticate),
            0x05 => Some(Opcode::Options),
            0x06 => Some(Opcode::Supported),
            0x07 => Some(Opcode::Query),
            0x08 => Some(Opcode::Result),
            0x09 => Some(Opcode::Prepare),
            0x0A => Some(Opcode::Execute),
            _ => None,
        }
    }
}

/// The parsed fixed header of a frame, before the body has been read.
///
/// Transports that read exact byte counts parse this first, then read
/// `body_length` more bytes to complete the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub flags: FrameFlags,
    pub stream: u8,
    /// Raw opcode byte; unrecognized opcodes survive decode and are
    /// surfaced at dispatch time.
    pub opcode: u8,
    pub body_length: u32,
}

impl FrameHeader {
    /// Decodes the 8-byte header. Fails if fewer than 8 bytes are given.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Err(ProtocolError::HeaderTooShort(buf.len()));
        }
        Ok(Self {
            version: buf[0],
            flags: FrameFlags::from_bits(buf[1]),
            stream: buf[2],
            opcode: buf[3],
            body_length: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Encodes the header as exactly 8 bytes, the inverse of [`decode`].
    ///
    /// [`decode`]: FrameHeader::decode
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let len = self.body_length.to_be_bytes();
        [
            self.version,
            self.flags.bits(),
            self.stream,
            self.opcode,
            len[0],
            len[1],
            len[2],
            len[3],
        ]
    }
}

/// One protocol message: header fields plus the body bytes they describe.
///
/// After decode, `body.len()` always equals the body length declared in
/// the header.
#[derive(Debug, Clone)]
pub struct Frame {
    pub version: u8,
    pub flags: FrameFlags,
    pub stream: u8,
    pub opcode: u8,
    pub body: Bytes,
}

impl Frame {
    /// Creates a request frame on the default stream.
    pub fn request(opcode: Opcode, body: Bytes) -> Self {
        Self {
            version: crate::REQUEST_VERSION,
            flags: FrameFlags::new(),
            stream: crate::DEFAULT_STREAM,
            opcode: opcode as u8,
            body,
        }
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            version: self.version,
            flags: self.flags,
            stream: self.stream,
            opcode: self.opcode,
            body_length: self.body.len() as u32,
        }
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        if self.body.len() > MAX_BODY_SIZE as usize {
            return Err(ProtocolError::BodyTooLarge {
                size: self.body.len(),
                max: MAX_BODY_SIZE,
            });
        }
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.body.len());
        buf.put_slice(&self.header().encode());
        buf.put_slice(&self.body);
        Ok(buf)
    }

    /// Decodes a frame from a receive buffer.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let header = FrameHeader::decode(&buf[..FRAME_HEADER_SIZE])?;
        if header.body_length > MAX_BODY_SIZE {
            return Err(ProtocolError::BodyTooLarge {
                size: header.body_length as usize,
                max: MAX_BODY_SIZE,
            });
        }

        let total = FRAME_HEADER_SIZE + header.body_length as usize;
        if buf.len() < total {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let body = buf.split_to(header.body_length as usize).freeze();

        Ok(Some(Self {
            version: header.version,
            flags: header.flags,
            stream: header.stream,
            opcode: header.opcode,
            body,
        }))
    }
}
