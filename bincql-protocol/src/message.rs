//! Request body builders and response dispatch.

use bytes::{Bytes, BytesMut};

use crate::codec::{
    put_bytes, put_long_string, put_short, put_short_bytes, put_string_map, Cursor,
};
use crate::error::{ErrorBody, ProtocolError};
use crate::frame::{Frame, Opcode};
use crate::result::QueryResult;

/// Startup option key naming the CQL version the client speaks.
pub const STARTUP_OPTION_CQL_VERSION: &str = "CQL_VERSION";
/// The CQL version spoken over protocol v1.
pub const STARTUP_CQL_VERSION: &str = "3.0.0";

/// Consistency levels, sent as an unsigned short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Consistency {
    Any = 0x0000,
    One = 0x0001,
    Two = 0x0002,
    Three = 0x0003,
    Quorum = 0x0004,
    All = 0x0005,
    LocalQuorum = 0x0006,
    EachQuorum = 0x0007,
}

/// A request body paired with the opcode that describes it.
#[derive(Debug, Clone)]
pub struct Request {
    pub opcode: Opcode,
    pub body: Bytes,
}

impl Request {
    /// STARTUP: a string map of options, insertion order kept on the wire.
    pub fn startup(options: &[(String, String)]) -> Result<Self, ProtocolError> {
        let mut body = BytesMut::new();
        put_string_map(&mut body, options)?;
        Ok(Self {
            opcode: Opcode::Startup,
            body: body.freeze(),
        })
    }

    /// STARTUP with the default `CQL_VERSION: 3.0.0` option.
    pub fn startup_default() -> Result<Self, ProtocolError> {
        Self::startup(&[(
            STARTUP_OPTION_CQL_VERSION.to_string(),
            STARTUP_CQL_VERSION.to_string(),
        )])
    }

    /// OPTIONS: empty body, valid before STARTUP.
    pub fn options() -> Self {
        Self {
            opcode: Opcode::Options,
            body: Bytes::new(),
        }
    }

    /// QUERY: the query text as a long string, then the consistency short.
    pub fn query(text: &str, consistency: Consistency) -> Result<Self, ProtocolError> {
        let mut body = BytesMut::new();
        put_long_string(&mut body, text)?;
        put_short(&mut body, consistency as u16);
        Ok(Self {
            opcode: Opcode::Query,
            body: body.freeze(),
        })
    }

    /// PREPARE: the query text as a long string.
    pub fn prepare(text: &str) -> Result<Self, ProtocolError> {
        let mut body = BytesMut::new();
        put_long_string(&mut body, text)?;
        Ok(Self {
            opcode: Opcode::Prepare,
            body: body.freeze(),
        })
    }

    /// EXECUTE: the prepared statement id as short bytes, a u16 value
    /// count, each value as `[bytes]` (with `None` as null), then the
    /// consistency short.
    pub fn execute(
        id: &[u8],
        values: &[Option<Vec<u8>>],
        consistency: Consistency,
    ) -> Result<Self, ProtocolError> {
        let mut body = BytesMut::new();
        put_short_bytes(&mut body, id)?;
        let count = u16::try_from(values.len()).map_err(|_| ProtocolError::LengthOverflow {
            len: values.len(),
            width: 2,
        })?;
        put_short(&mut body, count);
        for value in values {
            put_bytes(&mut body, value.as_deref())?;
        }
        put_short(&mut body, consistency as u16);
        Ok(Self {
            opcode: Opcode::Execute,
            body: body.freeze(),
        })
    }

    /// Wraps the request into a frame on the default stream.
    pub fn into_frame(self) -> Frame {
        Frame::request(self.opcode, self.body)
    }
}

/// A decoded response frame body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Ready,
    Authenticate(String),
    Supported(Vec<(String, Vec<String>)>),
    Result(QueryResult),
    Error(ErrorBody),
    /// An opcode this implementation does not dispatch on.
    Unknown { opcode: u8 },
}

/// A fully decoded response, trace id included when the server traced
/// the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub trace_id: Option<uuid::Uuid>,
    pub body: ResponseBody,
}

impl Response {
    /// Decodes a response frame body.
    ///
    /// When the tracing flag is set, an i32-prefixed 16-byte trace uuid
    /// sits before the body proper. A server ERROR frame decodes into
    /// `ResponseBody::Error`, not an `Err`.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let mut cur = Cursor::new(&frame.body);

        let trace_id = if frame.flags.is_tracing() {
            Some(cur.read_uuid()?)
        } else {
            None
        };

        let body = match Opcode::from_u8(frame.opcode) {
            Some(Opcode::Ready) => ResponseBody::Ready,
            Some(Opcode::Authenticate) => ResponseBody::Authenticate(cur.read_string()?),
            Some(Opcode::Supported) => ResponseBody::Supported(cur.read_string_multimap()?),
            Some(Opcode::Result) => ResponseBody::Result(QueryResult::decode(&mut cur)?),
            Some(Opcode::Error) => ResponseBody::Error(ErrorBody::decode(&mut cur)?),
            _ => ResponseBody::Unknown {
                opcode: frame.opcode,
            },
        };

        Ok(Self { trace_id, body })
    }
}
