//! Codec error types and server-reported error bodies.

use crate::codec::Cursor;
use std::fmt;
use thiserror::Error;

/// Errors raised while encoding or decoding protocol bytes.
///
/// A server-reported error frame is *not* one of these; it decodes
/// successfully into an [`ErrorBody`] value.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("truncated input: need {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("frame header too short: got {0} bytes, need 8")]
    HeaderTooShort(usize),

    #[error("frame body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: u32 },

    #[error("value of {len} bytes does not fit a {width}-byte length prefix")]
    LengthOverflow { len: usize, width: usize },

    #[error("negative length {0} where null is not permitted")]
    NegativeLength(i32),

    #[error("invalid UTF-8 in string")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("uuid value must be 16 bytes, got {0}")]
    InvalidUuidLength(usize),

    #[error("inet address must be 4 or 16 bytes, got {0}")]
    InvalidInetLength(usize),

    #[error("floating-point value must be {expected} bytes, got {got}")]
    InvalidFloatLength { expected: usize, got: usize },

    #[error("integer value of {0} bytes exceeds 64 bits")]
    IntegerTooWide(usize),

    #[error("nested collections are not supported by this protocol version")]
    NestedCollection,

    #[error("unknown column type id {0:#06x}")]
    UnknownTypeId(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server error codes from the ERROR frame body.
///
/// Codes this implementation does not recognize are preserved in `Other`
/// and carry no detail fields, so new server codes decode instead of
/// failing the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ServerError,
    ProtocolViolation,
    BadCredentials,
    Unavailable,
    Overloaded,
    IsBootstrapping,
    TruncateError,
    WriteTimeout,
    ReadTimeout,
    SyntaxError,
    Unauthorized,
    Invalid,
    ConfigError,
    AlreadyExists,
    Unprepared,
    Other(i32),
}

impl ErrorCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0x0000 => ErrorCode::ServerError,
            0x000A => ErrorCode::ProtocolViolation,
            0x0100 => ErrorCode::BadCredentials,
            0x1000 => ErrorCode::Unavailable,
            0x1001 => ErrorCode::Overloaded,
            0x1002 => ErrorCode::IsBootstrapping,
            0x1003 => ErrorCode::TruncateError,
            0x1100 => ErrorCode::WriteTimeout,
            0x1200 => ErrorCode::ReadTimeout,
            0x2000 => ErrorCode::SyntaxError,
            0x2100 => ErrorCode::Unauthorized,
            0x2200 => ErrorCode::Invalid,
            0x2300 => ErrorCode::ConfigError,
            0x2400 => ErrorCode::AlreadyExists,
            0x2500 => ErrorCode::Unprepared,
            other => ErrorCode::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::ServerError => 0x0000,
            ErrorCode::ProtocolViolation => 0x000A,
            ErrorCode::BadCredentials => 0x0100,
            ErrorCode::Unavailable => 0x1000,
            ErrorCode::Overloaded => 0x1001,
            ErrorCode::IsBootstrapping => 0x1002,
            ErrorCode::TruncateError => 0x1003,
            ErrorCode::WriteTimeout => 0x1100,
            ErrorCode::ReadTimeout => 0x1200,
            ErrorCode::SyntaxError => 0x2000,
            ErrorCode::Unauthorized => 0x2100,
            ErrorCode::Invalid => 0x2200,
            ErrorCode::ConfigError => 0x2300,
            ErrorCode::AlreadyExists => 0x2400,
            ErrorCode::Unprepared => 0x2500,
            ErrorCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::ServerError => write!(f, "SERVER_ERROR"),
            ErrorCode::ProtocolViolation => write!(f, "PROTOCOL_ERROR"),
            ErrorCode::BadCredentials => write!(f, "BAD_CREDENTIALS"),
            ErrorCode::Unavailable => write!(f, "UNAVAILABLE"),
            ErrorCode::Overloaded => write!(f, "OVERLOADED"),
            ErrorCode::IsBootstrapping => write!(f, "IS_BOOTSTRAPPING"),
            ErrorCode::TruncateError => write!(f, "TRUNCATE_ERROR"),
            ErrorCode::WriteTimeout => write!(f, "WRITE_TIMEOUT"),
            ErrorCode::ReadTimeout => write!(f, "READ_TIMEOUT"),
            ErrorCode::SyntaxError => write!(f, "SYNTAX_ERROR"),
            ErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            ErrorCode::Invalid => write!(f, "INVALID"),
            ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
            ErrorCode::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            ErrorCode::Unprepared => write!(f, "UNPREPARED"),
            ErrorCode::Other(code) => write!(f, "UNKNOWN({code:#06x})"),
        }
    }
}

/// Code-dependent detail fields of an ERROR frame body.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    /// Simple codes carry only the code and message.
    None,
    Unavailable {
        consistency: u16,
        required: i32,
        alive: i32,
    },
    WriteTimeout {
        consistency: u16,
        received: i32,
        block_for: i32,
        write_type: String,
    },
    ReadTimeout {
        consistency: u16,
        received: i32,
        block_for: i32,
        data_present: bool,
    },
    AlreadyExists {
        keyspace: String,
        table: String,
    },
    Unprepared {
        unknown_id: Vec<u8>,
    },
}

/// A fully decoded ERROR frame body.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub detail: ErrorDetail,
}

impl ErrorBody {
    /// Decodes an ERROR frame body: a 4-byte code, a string message, then
    /// detail fields keyed by the code.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let code = ErrorCode::from_code(cur.read_i32()?);
        let message = cur.read_string()?;

        let detail = match code {
            ErrorCode::Unavailable => ErrorDetail::Unavailable {
                consistency: cur.read_u16()?,
                required: cur.read_i32()?,
                alive: cur.read_i32()?,
            },
            ErrorCode::WriteTimeout => ErrorDetail::WriteTimeout {
                consistency: cur.read_u16()?,
                received: cur.read_i32()?,
                block_for: cur.read_i32()?,
                write_type: cur.read_string()?,
            },
            ErrorCode::ReadTimeout => ErrorDetail::ReadTimeout {
                consistency: cur.read_u16()?,
                received: cur.read_i32()?,
                block_for: cur.read_i32()?,
                data_present: cur.read_u8()? != 0,
            },
            ErrorCode::AlreadyExists => ErrorDetail::AlreadyExists {
                keyspace: cur.read_string()?,
                table: cur.read_string()?,
            },
            ErrorCode::Unprepared => ErrorDetail::Unprepared {
                unknown_id: cur.read_short_bytes()?.to_vec(),
            },
            _ => ErrorDetail::None,
        };

        Ok(ErrorBody {
            code,
            message,
            detail,
        })
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn body(code: i32, message: &str, extra: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_i32(code);
        buf.put_u16(message.len() as u16);
        buf.put_slice(message.as_bytes());
        buf.put_slice(extra);
        buf
    }

    #[test]
    fn test_unavailable_detail_field_order() {
        // consistency (short), required (int), alive (int), in that order
        let mut extra = BytesMut::new();
        extra.put_u16(0x0004); // quorum
        extra.put_i32(3);
        extra.put_i32(1);
        let buf = body(0x1000, "Cannot achieve consistency level QUORUM", &extra);

        let mut cur = Cursor::new(&buf);
        let err = ErrorBody::decode(&mut cur).unwrap();
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert_eq!(
            err.detail,
            ErrorDetail::Unavailable {
                consistency: 4,
                required: 3,
                alive: 1,
            }
        );
    }

    #[test]
    fn test_syntax_error_has_no_detail() {
        let buf = body(0x2000, "line 1:0 no viable alternative", &[]);
        let mut cur = Cursor::new(&buf);
        let err = ErrorBody::decode(&mut cur).unwrap();
        assert_eq!(err.code, ErrorCode::SyntaxError);
        assert_eq!(err.detail, ErrorDetail::None);
        assert_eq!(err.message, "line 1:0 no viable alternative");
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_read_timeout_detail() {
        let mut extra = BytesMut::new();
        extra.put_u16(0x0001);
        extra.put_i32(0);
        extra.put_i32(1);
        extra.put_u8(0x01);
        let buf = body(0x1200, "Operation timed out", &extra);

        let mut cur = Cursor::new(&buf);
        let err = ErrorBody::decode(&mut cur).unwrap();
        assert_eq!(
            err.detail,
            ErrorDetail::ReadTimeout {
                consistency: 1,
                received: 0,
                block_for: 1,
                data_present: true,
            }
        );
    }

    #[test]
    fn test_write_timeout_detail() {
        let mut extra = BytesMut::new();
        extra.put_u16(0x0005);
        extra.put_i32(1);
        extra.put_i32(2);
        extra.put_u16(5);
        extra.put_slice(b"BATCH");
        let buf = body(0x1100, "timeout", &extra);

        let mut cur = Cursor::new(&buf);
        let err = ErrorBody::decode(&mut cur).unwrap();
        assert_eq!(
            err.detail,
            ErrorDetail::WriteTimeout {
                consistency: 5,
                received: 1,
                block_for: 2,
                write_type: "BATCH".to_string(),
            }
        );
    }

    #[test]
    fn test_already_exists_detail() {
        let mut extra = BytesMut::new();
        extra.put_u16(4);
        extra.put_slice(b"ks_1");
        extra.put_u16(5);
        extra.put_slice(b"users");
        let buf = body(0x2400, "Table already exists", &extra);

        let mut cur = Cursor::new(&buf);
        let err = ErrorBody::decode(&mut cur).unwrap();
        assert_eq!(
            err.detail,
            ErrorDetail::AlreadyExists {
                keyspace: "ks_1".to_string(),
                table: "users".to_string(),
            }
        );
    }

    #[test]
    fn test_unprepared_detail() {
        let mut extra = BytesMut::new();
        extra.put_u16(4);
        extra.put_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let buf = body(0x2500, "Unknown prepared statement", &extra);

        let mut cur = Cursor::new(&buf);
        let err = ErrorBody::decode(&mut cur).unwrap();
        assert_eq!(
            err.detail,
            ErrorDetail::Unprepared {
                unknown_id: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }
        );
    }

    #[test]
    fn test_unknown_code_decodes_without_detail() {
        let buf = body(0x7777, "future error kind", &[]);
        let mut cur = Cursor::new(&buf);
        let err = ErrorBody::decode(&mut cur).unwrap();
        assert_eq!(err.code, ErrorCode::Other(0x7777));
        assert_eq!(err.code.code(), 0x7777);
        assert_eq!(err.detail, ErrorDetail::None);
    }

    #[test]
    fn test_error_code_round_trip() {
        for code in [
            0x0000, 0x000A, 0x0100, 0x1000, 0x1001, 0x1002, 0x1003, 0x1100, 0x1200, 0x2000,
            0x2100, 0x2200, 0x2300, 0x2400, 0x2500,
        ] {
            assert_eq!(ErrorCode::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_error_body_display() {
        let err = ErrorBody {
            code: ErrorCode::SyntaxError,
            message: "bad query".to_string(),
            detail: ErrorDetail::None,
        };
        assert_eq!(err.to_string(), "SYNTAX_ERROR: bad query");
    }
}
