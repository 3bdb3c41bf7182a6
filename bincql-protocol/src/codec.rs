//! Primitive wire encodings.
//!
//! Every multi-byte integer on the wire is big-endian. Reads go through
//! [`Cursor`], an explicit position over a borrowed buffer that is created
//! fresh for each decode pass; there is no decoder state that can leak
//! between frames. Writes are free functions over a [`BytesMut`].

use crate::error::ProtocolError;
use bytes::{BufMut, BytesMut};
use uuid::Uuid;

/// A read position over a byte buffer.
///
/// All decode routines take a `&mut Cursor` and advance it by exactly the
/// bytes they consume. Reading past the end yields
/// [`ProtocolError::Truncated`] rather than panicking.
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Current position from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// A 2-byte unsigned big-endian integer. Never sign-extends.
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// A 4-byte signed big-endian integer.
    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// `[bytes]`: an i32 length followed by that many bytes. A negative
    /// length means null and consumes no further bytes.
    pub fn read_bytes(&mut self) -> Result<Option<&'a [u8]>, ProtocolError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        Ok(Some(self.take(len as usize)?))
    }

    /// `[short bytes]`: a u16 length followed by that many bytes.
    pub fn read_short_bytes(&mut self) -> Result<&'a [u8], ProtocolError> {
        let len = self.read_u16()?;
        self.take(len as usize)
    }

    /// `[string]`: a u16 byte length followed by UTF-8 bytes. Invalid UTF-8
    /// is a decode error, never replaced.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_short_bytes()?;
        Ok(std::str::from_utf8(bytes)?.to_string())
    }

    /// `[long string]`: an i32 byte length followed by UTF-8 bytes.
    pub fn read_long_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)?.to_string())
    }

    /// `[string list]`: a u16 count followed by that many `[string]`s,
    /// wire order preserved.
    pub fn read_string_list(&mut self) -> Result<Vec<String>, ProtocolError> {
        let count = self.read_u16()?;
        let mut list = Vec::with_capacity(count as usize);
        for _ in 0..count {
            list.push(self.read_string()?);
        }
        Ok(list)
    }

    /// `[string map]`: a u16 pair count followed by `[string][string]`
    /// pairs, wire order preserved.
    pub fn read_string_map(&mut self) -> Result<Vec<(String, String)>, ProtocolError> {
        let count = self.read_u16()?;
        let mut map = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = self.read_string()?;
            let value = self.read_string()?;
            map.push((key, value));
        }
        Ok(map)
    }

    /// `[string multimap]`: a u16 pair count followed by
    /// `[string][string list]` pairs.
    pub fn read_string_multimap(&mut self) -> Result<Vec<(String, Vec<String>)>, ProtocolError> {
        let count = self.read_u16()?;
        let mut map = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = self.read_string()?;
            let values = self.read_string_list()?;
            map.push((key, values));
        }
        Ok(map)
    }

    /// An i32-length-prefixed 16-byte uuid block.
    pub fn read_uuid(&mut self) -> Result<Uuid, ProtocolError> {
        let bytes = self
            .read_bytes()?
            .ok_or(ProtocolError::InvalidUuidLength(0))?;
        uuid_from_bytes(bytes)
    }

    /// An i32-length-prefixed inet address block, rendered per
    /// [`format_inet`].
    pub fn read_inet(&mut self) -> Result<String, ProtocolError> {
        let bytes = self
            .read_bytes()?
            .ok_or(ProtocolError::InvalidInetLength(0))?;
        format_inet(bytes)
    }
}

/// Interprets a 16-byte block as a uuid.
pub fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid, ProtocolError> {
    Uuid::from_slice(bytes).map_err(|_| ProtocolError::InvalidUuidLength(bytes.len()))
}

/// Renders an inet address payload: 4 bytes as dotted-decimal IPv4,
/// 16 bytes as 8 colon-separated groups of 4 hex digits.
pub fn format_inet(bytes: &[u8]) -> Result<String, ProtocolError> {
    match bytes.len() {
        4 => Ok(format!(
            "{}.{}.{}.{}",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )),
        16 => {
            let groups: Vec<String> = bytes
                .chunks(2)
                .map(|pair| format!("{:02x}{:02x}", pair[0], pair[1]))
                .collect();
            Ok(groups.join(":"))
        }
        n => Err(ProtocolError::InvalidInetLength(n)),
    }
}

/// Decodes a big-endian two's-complement signed integer over however many
/// bytes the value actually occupies on the wire (at most 8).
pub fn decode_signed_be(bytes: &[u8]) -> Result<i64, ProtocolError> {
    if bytes.len() > 8 {
        return Err(ProtocolError::IntegerTooWide(bytes.len()));
    }
    // Seed with the sign so shorter widths extend correctly.
    let mut value: i64 = if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        -1
    } else {
        0
    };
    for &b in bytes {
        value = (value << 8) | i64::from(b);
    }
    Ok(value)
}

pub fn put_int(buf: &mut BytesMut, value: i32) {
    buf.put_i32(value);
}

pub fn put_short(buf: &mut BytesMut, value: u16) {
    buf.put_u16(value);
}

/// `[string]`: u16 byte-length prefix (UTF-8 byte count, not characters)
/// plus the raw bytes.
pub fn put_string(buf: &mut BytesMut, value: &str) -> Result<(), ProtocolError> {
    let len = u16::try_from(value.len()).map_err(|_| ProtocolError::LengthOverflow {
        len: value.len(),
        width: 2,
    })?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// `[long string]`: i32 byte-length prefix plus the raw bytes.
pub fn put_long_string(buf: &mut BytesMut, value: &str) -> Result<(), ProtocolError> {
    let len = i32::try_from(value.len()).map_err(|_| ProtocolError::LengthOverflow {
        len: value.len(),
        width: 4,
    })?;
    buf.put_i32(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// `[bytes]`: i32 length prefix plus raw bytes; `None` encodes as -1 with
/// no payload.
pub fn put_bytes(buf: &mut BytesMut, value: Option<&[u8]>) -> Result<(), ProtocolError> {
    match value {
        None => buf.put_i32(-1),
        Some(bytes) => {
            let len = i32::try_from(bytes.len()).map_err(|_| ProtocolError::LengthOverflow {
                len: bytes.len(),
                width: 4,
            })?;
            buf.put_i32(len);
            buf.put_slice(bytes);
        }
    }
    Ok(())
}

/// `[short bytes]`: u16 length prefix plus raw bytes.
pub fn put_short_bytes(buf: &mut BytesMut, value: &[u8]) -> Result<(), ProtocolError> {
    let len = u16::try_from(value.len()).map_err(|_| ProtocolError::LengthOverflow {
        len: value.len(),
        width: 2,
    })?;
    buf.put_u16(len);
    buf.put_slice(value);
    Ok(())
}

/// `[string map]`: u16 pair count plus `[string][string]` pairs in the
/// order given.
pub fn put_string_map(buf: &mut BytesMut, map: &[(String, String)]) -> Result<(), ProtocolError> {
    let count = u16::try_from(map.len()).map_err(|_| ProtocolError::LengthOverflow {
        len: map.len(),
        width: 2,
    })?;
    buf.put_u16(count);
    for (key, value) in map {
        put_string(buf, key)?;
        put_string(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_is_unsigned() {
        let buf = [0xFF, 0xFE];
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_u16().unwrap(), 0xFFFE);
    }

    #[test]
    fn test_int_is_signed() {
        let mut buf = BytesMut::new();
        put_int(&mut buf, -42);
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_i32().unwrap(), -42);
    }

    #[test]
    fn test_string_round_trip_multibyte() {
        // Byte length, not character count: "žluťoučký" is 9 chars, 13 bytes.
        let s = "žluťoučký kůň 🐎";
        let mut buf = BytesMut::new();
        put_string(&mut buf, s).unwrap();
        assert_eq!(u16::from_be_bytes([buf[0], buf[1]]) as usize, s.len());

        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_string().unwrap(), s);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_long_string_round_trip() {
        let s = "SELECT * FROM system.peers";
        let mut buf = BytesMut::new();
        put_long_string(&mut buf, s).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_long_string().unwrap(), s);
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let buf = [0x00, 0x02, 0xC3, 0x28];
        let mut cur = Cursor::new(&buf);
        assert!(matches!(
            cur.read_string(),
            Err(ProtocolError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_bytes_negative_length_is_null() {
        let mut buf = BytesMut::new();
        put_bytes(&mut buf, None).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_bytes().unwrap(), None);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_short_bytes_round_trip() {
        let mut buf = BytesMut::new();
        put_short_bytes(&mut buf, &[1, 2, 3]).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_short_bytes().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_string_map_round_trip_preserves_order() {
        let map = vec![
            ("CQL_VERSION".to_string(), "3.0.0".to_string()),
            ("COMPRESSION".to_string(), "snappy".to_string()),
        ];
        let mut buf = BytesMut::new();
        put_string_map(&mut buf, &map).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_string_map().unwrap(), map);
    }

    #[test]
    fn test_string_multimap() {
        let mut buf = BytesMut::new();
        put_short(&mut buf, 2);
        put_string(&mut buf, "CQL_VERSION").unwrap();
        put_short(&mut buf, 1);
        put_string(&mut buf, "3.0.0").unwrap();
        put_string(&mut buf, "COMPRESSION").unwrap();
        put_short(&mut buf, 2);
        put_string(&mut buf, "snappy").unwrap();
        put_string(&mut buf, "lz4").unwrap();

        let mut cur = Cursor::new(&buf);
        let mm = cur.read_string_multimap().unwrap();
        assert_eq!(mm.len(), 2);
        assert_eq!(mm[0], ("CQL_VERSION".to_string(), vec!["3.0.0".to_string()]));
        assert_eq!(
            mm[1],
            (
                "COMPRESSION".to_string(),
                vec!["snappy".to_string(), "lz4".to_string()]
            )
        );
    }

    #[test]
    fn test_uuid_canonical_rendering() {
        let raw = [
            0x6d, 0x3f, 0xf5, 0xa0, 0x58, 0x6b, 0x11, 0xe3, 0x94, 0x9a, 0x08, 0x00, 0x20, 0x0c,
            0x9a, 0x66,
        ];
        let mut buf = BytesMut::new();
        put_bytes(&mut buf, Some(&raw)).unwrap();
        let mut cur = Cursor::new(&buf);
        let uuid = cur.read_uuid().unwrap();
        assert_eq!(uuid.to_string(), "6d3ff5a0-586b-11e3-949a-0800200c9a66");
    }

    #[test]
    fn test_uuid_wrong_length() {
        let mut buf = BytesMut::new();
        put_bytes(&mut buf, Some(&[0u8; 8])).unwrap();
        let mut cur = Cursor::new(&buf);
        assert!(matches!(
            cur.read_uuid(),
            Err(ProtocolError::InvalidUuidLength(8))
        ));
    }

    #[test]
    fn test_inet_v4() {
        assert_eq!(format_inet(&[192, 168, 2, 240]).unwrap(), "192.168.2.240");
    }

    #[test]
    fn test_inet_v6_full_grouping() {
        let mut raw = [0u8; 16];
        raw[15] = 1;
        assert_eq!(
            format_inet(&raw).unwrap(),
            "0000:0000:0000:0000:0000:0000:0000:0001"
        );
    }

    #[test]
    fn test_inet_invalid_length() {
        assert!(matches!(
            format_inet(&[1, 2, 3]),
            Err(ProtocolError::InvalidInetLength(3))
        ));
    }

    #[test]
    fn test_truncated_read() {
        let buf = [0x00];
        let mut cur = Cursor::new(&buf);
        assert!(matches!(
            cur.read_i32(),
            Err(ProtocolError::Truncated {
                needed: 4,
                remaining: 1
            })
        ));
    }

    #[test]
    fn test_signed_decode_extremes() {
        assert_eq!(
            decode_signed_be(&i64::MAX.to_be_bytes()).unwrap(),
            9223372036854775807
        );
        assert_eq!(
            decode_signed_be(&i64::MIN.to_be_bytes()).unwrap(),
            -9223372036854775808
        );
        assert_eq!(decode_signed_be(&i32::MIN.to_be_bytes()).unwrap(), -2147483648);
        assert_eq!(decode_signed_be(&[0xFF]).unwrap(), -1);
        assert_eq!(decode_signed_be(&[]).unwrap(), 0);
    }

    #[test]
    fn test_signed_decode_too_wide() {
        assert!(matches!(
            decode_signed_be(&[0u8; 9]),
            Err(ProtocolError::IntegerTooWide(9))
        ));
    }

    proptest! {
        #[test]
        fn prop_i32_round_trip(v in any::<i32>()) {
            let mut buf = BytesMut::new();
            put_int(&mut buf, v);
            let mut cur = Cursor::new(&buf);
            prop_assert_eq!(cur.read_i32().unwrap(), v);
        }

        #[test]
        fn prop_i64_two_complement_round_trip(v in any::<i64>()) {
            prop_assert_eq!(decode_signed_be(&v.to_be_bytes()).unwrap(), v);
        }

        #[test]
        fn prop_i32_width_two_complement_round_trip(v in any::<i32>()) {
            prop_assert_eq!(
                decode_signed_be(&v.to_be_bytes()).unwrap(),
                i64::from(v)
            );
        }

        #[test]
        fn prop_string_round_trip(s in "\\PC*") {
            prop_assume!(s.len() <= u16::MAX as usize);
            let mut buf = BytesMut::new();
            put_string(&mut buf, &s).unwrap();
            let mut cur = Cursor::new(&buf);
            prop_assert_eq!(cur.read_string().unwrap(), s);
        }
    }
}
