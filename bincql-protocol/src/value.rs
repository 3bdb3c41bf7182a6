//! Column types and per-cell value decoding.
//!
//! The same type-driven switch exists in two forms: the long form
//! ([`decode_value`], i32 length prefixes) for top-level row cells, and the
//! short form ([`decode_element`], u16 length prefixes) for collection
//! elements. They are not interchangeable.

use crate::codec::{self, Cursor};
use crate::error::ProtocolError;
use uuid::Uuid;

/// Wire ids for column types.
mod type_id {
    pub const CUSTOM: u16 = 0x0000;
    pub const ASCII: u16 = 0x0001;
    pub const BIGINT: u16 = 0x0002;
    pub const BLOB: u16 = 0x0003;
    pub const BOOLEAN: u16 = 0x0004;
    pub const COUNTER: u16 = 0x0005;
    pub const DECIMAL: u16 = 0x0006;
    pub const DOUBLE: u16 = 0x0007;
    pub const FLOAT: u16 = 0x0008;
    pub const INT: u16 = 0x0009;
    pub const TEXT: u16 = 0x000A;
    pub const TIMESTAMP: u16 = 0x000B;
    pub const UUID: u16 = 0x000C;
    pub const VARCHAR: u16 = 0x000D;
    pub const VARINT: u16 = 0x000E;
    pub const TIMEUUID: u16 = 0x000F;
    pub const INET: u16 = 0x0010;
    pub const LIST: u16 = 0x0020;
    pub const MAP: u16 = 0x0021;
    pub const SET: u16 = 0x0022;
}

/// A column type descriptor as carried in row metadata.
///
/// In this protocol version collections cannot nest, so list/set elements
/// and map keys/values are always scalars (or a named custom type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// A server-defined type, identified by class name.
    Custom(String),
    Ascii,
    Bigint,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Int,
    Text,
    Timestamp,
    Uuid,
    Varchar,
    Varint,
    Timeuuid,
    Inet,
    List(Box<ColumnType>),
    Set(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
}

impl ColumnType {
    /// Reads a type id plus its id-dependent type value from metadata:
    /// custom carries a name string, list/set carry an element type id
    /// (itself possibly custom with a name), map carries key and value ids.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let id = cur.read_u16()?;
        match id {
            type_id::CUSTOM => Ok(ColumnType::Custom(cur.read_string()?)),
            type_id::LIST => Ok(ColumnType::List(Box::new(Self::decode_element_type(cur)?))),
            type_id::SET => Ok(ColumnType::Set(Box::new(Self::decode_element_type(cur)?))),
            type_id::MAP => {
                let key = Self::scalar_from_id(cur.read_u16()?)?;
                let value = Self::scalar_from_id(cur.read_u16()?)?;
                Ok(ColumnType::Map(Box::new(key), Box::new(value)))
            }
            other => Self::scalar_from_id(other),
        }
    }

    fn decode_element_type(cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let id = cur.read_u16()?;
        if id == type_id::CUSTOM {
            return Ok(ColumnType::Custom(cur.read_string()?));
        }
        Self::scalar_from_id(id)
    }

    fn scalar_from_id(id: u16) -> Result<Self, ProtocolError> {
        match id {
            type_id::ASCII => Ok(ColumnType::Ascii),
            type_id::BIGINT => Ok(ColumnType::Bigint),
            type_id::BLOB => Ok(ColumnType::Blob),
            type_id::BOOLEAN => Ok(ColumnType::Boolean),
            type_id::COUNTER => Ok(ColumnType::Counter),
            type_id::DECIMAL => Ok(ColumnType::Decimal),
            type_id::DOUBLE => Ok(ColumnType::Double),
            type_id::FLOAT => Ok(ColumnType::Float),
            type_id::INT => Ok(ColumnType::Int),
            type_id::TEXT => Ok(ColumnType::Text),
            type_id::TIMESTAMP => Ok(ColumnType::Timestamp),
            type_id::UUID => Ok(ColumnType::Uuid),
            type_id::VARCHAR => Ok(ColumnType::Varchar),
            type_id::VARINT => Ok(ColumnType::Varint),
            type_id::TIMEUUID => Ok(ColumnType::Timeuuid),
            type_id::INET => Ok(ColumnType::Inet),
            type_id::LIST | type_id::MAP | type_id::SET => Err(ProtocolError::NestedCollection),
            other => Err(ProtocolError::UnknownTypeId(other)),
        }
    }
}

/// One decoded cell value.
///
/// Every CQL type decodes into exactly one of these variants; callers
/// project to host types from here.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    Blob(Vec<u8>),
    Bool(bool),
    Uuid(Uuid),
    /// bigint, counter, varint, timestamp and int: two's-complement over
    /// the bytes present on the wire.
    Int(i64),
    Double(f64),
    Float(f32),
    /// Dotted-decimal IPv4 or fully-grouped IPv6.
    Inet(String),
    List(Vec<ColumnValue>),
    Set(Vec<ColumnValue>),
    /// Insertion order equals wire order.
    Map(Vec<(ColumnValue, ColumnValue)>),
}

/// Decodes one top-level row cell (long form, i32 length prefixes).
pub fn decode_value(cur: &mut Cursor<'_>, ty: &ColumnType) -> Result<ColumnValue, ProtocolError> {
    match ty {
        ColumnType::List(elem) => {
            // A leading int precedes the element count on the wire but
            // carries no information; read and discard.
            let _ = cur.read_i32()?;
            Ok(ColumnValue::List(decode_elements(cur, elem)?))
        }
        ColumnType::Set(elem) => {
            let _ = cur.read_i32()?;
            Ok(ColumnValue::Set(decode_elements(cur, elem)?))
        }
        ColumnType::Map(key, value) => {
            let _ = cur.read_i32()?;
            let count = cur.read_u16()?;
            let mut pairs = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let k = decode_element(cur, key)?;
                let v = decode_element(cur, value)?;
                pairs.push((k, v));
            }
            Ok(ColumnValue::Map(pairs))
        }
        scalar => match cur.read_bytes()? {
            None => Ok(ColumnValue::Null),
            Some(bytes) => decode_scalar(scalar, bytes),
        },
    }
}

/// Decodes one collection element (short form, u16 length prefix).
pub fn decode_element(cur: &mut Cursor<'_>, ty: &ColumnType) -> Result<ColumnValue, ProtocolError> {
    match ty {
        ColumnType::List(_) | ColumnType::Set(_) | ColumnType::Map(_, _) => {
            Err(ProtocolError::NestedCollection)
        }
        scalar => {
            let bytes = cur.read_short_bytes()?;
            decode_scalar(scalar, bytes)
        }
    }
}

fn decode_elements(
    cur: &mut Cursor<'_>,
    elem: &ColumnType,
) -> Result<Vec<ColumnValue>, ProtocolError> {
    let count = cur.read_u16()?;
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        values.push(decode_element(cur, elem)?);
    }
    Ok(values)
}

/// Interprets an already-extracted cell payload by column type.
fn decode_scalar(ty: &ColumnType, bytes: &[u8]) -> Result<ColumnValue, ProtocolError> {
    match ty {
        ColumnType::Ascii | ColumnType::Varchar | ColumnType::Text => {
            Ok(ColumnValue::Text(std::str::from_utf8(bytes)?.to_string()))
        }
        ColumnType::Blob | ColumnType::Custom(_) => Ok(ColumnValue::Blob(bytes.to_vec())),
        ColumnType::Boolean => Ok(ColumnValue::Bool(bytes.first().is_some_and(|&b| b != 0))),
        ColumnType::Uuid | ColumnType::Timeuuid => {
            Ok(ColumnValue::Uuid(codec::uuid_from_bytes(bytes)?))
        }
        ColumnType::Bigint
        | ColumnType::Counter
        | ColumnType::Varint
        | ColumnType::Timestamp
        | ColumnType::Int => Ok(ColumnValue::Int(codec::decode_signed_be(bytes)?)),
        ColumnType::Double | ColumnType::Decimal => {
            let raw: [u8; 8] = bytes
                .try_into()
                .map_err(|_| ProtocolError::InvalidFloatLength {
                    expected: 8,
                    got: bytes.len(),
                })?;
            Ok(ColumnValue::Double(f64::from_be_bytes(raw)))
        }
        ColumnType::Float => {
            let raw: [u8; 4] = bytes
                .try_into()
                .map_err(|_| ProtocolError::InvalidFloatLength {
                    expected: 4,
                    got: bytes.len(),
                })?;
            Ok(ColumnValue::Float(f32::from_be_bytes(raw)))
        }
        ColumnType::Inet => Ok(ColumnValue::Inet(codec::format_inet(bytes)?)),
        ColumnType::List(_) | ColumnType::Set(_) | ColumnType::Map(_, _) => {
            Err(ProtocolError::NestedCollection)
        }
    }
}
