//! Frame capture hooks.
//!
//! A capture sees the exact encoded bytes of every frame sent and
//! received, useful for replaying sessions or debugging a server's
//! responses offline.

use bincql_protocol::FrameHeader;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Receives the encoded bytes of every transmitted and received frame.
///
/// Capture failures are logged and never fail the request.
pub trait FrameCapture: Send + Sync {
    fn capture(&self, header: &FrameHeader, encoded: &[u8]) -> io::Result<()>;
}

/// Writes each frame to its own file in a directory.
///
/// File names encode capture time and the header fields:
/// `{secs}.{millis}_{version:02x}_{flags:02x}_{stream:02x}_{opcode:02x}.cqlframe`.
#[derive(Debug, Clone)]
pub struct FileCapture {
    dir: PathBuf,
}

impl FileCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FrameCapture for FileCapture {
    fn capture(&self, header: &FrameHeader, encoded: &[u8]) -> io::Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let name = format!(
            "{}.{:03}_{:02x}_{:02x}_{:02x}_{:02x}.cqlframe",
            now.as_secs(),
            now.subsec_millis(),
            header.version,
            header.flags.bits(),
            header.stream,
            header.opcode,
        );
        std::fs::write(self.dir.join(name), encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bincql_protocol::FrameFlags;

    #[test]
    fn test_file_capture_writes_named_frame_file() {
        let dir = tempfile::tempdir().unwrap();
        let capture = FileCapture::new(dir.path());

        let header = FrameHeader {
            version: 0x81,
            flags: FrameFlags::from_bits(0x02),
            stream: 0x00,
            opcode: 0x08,
            body_length: 4,
        };
        let encoded = [0x81, 0x02, 0x00, 0x08, 0, 0, 0, 4, 0, 0, 0, 1];
        capture.capture(&header, &encoded).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(entries.len(), 1);

        let name = entries[0].file_name().into_string().unwrap();
        assert!(name.ends_with("_81_02_00_08.cqlframe"), "name: {name}");
        assert_eq!(std::fs::read(entries[0].path()).unwrap(), encoded);
    }
}
