//! # bincql-protocol
//!
//! Codec for version 1 of the CQL native wire protocol.
//!
//! This crate provides:
//! - The 8-byte frame header codec and frame ownership
//! - Primitive encodings (ints, shorts, length-prefixed strings/bytes, maps)
//! - Typed result decoding (row metadata, per-column value decoding)
//! - Error body decoding keyed by server error code
//! - Request body builders (STARTUP, QUERY, PREPARE, EXECUTE)
//!
//! Everything here is a pure transformation between byte buffers and typed
//! values; sockets, buffering and request sequencing live in `bincql-client`.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod result;
pub mod value;

pub use codec::Cursor;
pub use error::{ErrorBody, ErrorCode, ErrorDetail, ProtocolError};
pub use frame::{Frame, FrameFlags, FrameHeader, Opcode, FRAME_HEADER_SIZE};
pub use message::{Consistency, Request, Response, ResponseBody};
pub use result::{ColumnSpec, QueryResult, Row, RowMetadata, TableSpec};
pub use value::{ColumnType, ColumnValue};

/// Version byte carried by request frames.
pub const REQUEST_VERSION: u8 = 0x01;

/// Version byte carried by response frames.
pub const RESPONSE_VERSION: u8 = 0x81;

/// Stream id used for every frame; pipelining is not supported, so requests
/// and responses always correlate on the default stream.
pub const DEFAULT_STREAM: u8 = 0x00;

/// Default CQL native protocol port.
pub const DEFAULT_PORT: u16 = 9042;

/// Maximum frame body size accepted by the codec (256 MiB).
pub const MAX_BODY_SIZE: u32 = 256 * 1024 * 1024;
