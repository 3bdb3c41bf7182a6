//! Connection management.

use crate::capture::FrameCapture;
use crate::error::ClientError;
use bincql_protocol::{Frame, FrameFlags, Response, DEFAULT_PORT};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Decompresses received frame bodies.
///
/// The wire codec never decompresses; a connection configured with a
/// compressor swaps a compressed body for the decompressed bytes before
/// the response is decoded. No algorithm ships with this crate.
pub trait Compressor: Send + Sync {
    fn decompress(&self, body: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout, covering the whole response read.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// Options sent in the STARTUP body, wire order preserved.
    pub startup_options: Vec<(String, String)>,
    /// Request tracing from the server on every request frame.
    pub tracing: bool,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            startup_options: vec![(
                bincql_protocol::message::STARTUP_OPTION_CQL_VERSION.to_string(),
                bincql_protocol::message::STARTUP_CQL_VERSION.to_string(),
            )],
            tracing: false,
        }
    }

    /// Config for `host:9042`-style defaults.
    pub fn for_host(host: std::net::IpAddr) -> Self {
        Self::new(SocketAddr::new(host, DEFAULT_PORT))
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_startup_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.startup_options.push((key.into(), value.into()));
        self
    }

    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }
}

/// A connection to a CQL native protocol server.
///
/// The protocol carries no request correlation beyond the single stream
/// id, so requests are strictly sequential: `call` holds the stream for
/// the full write/read exchange.
pub struct Connection {
    config: ConnectionConfig,
    stream: Mutex<Option<TcpStream>>,
    recv_buf: Mutex<BytesMut>,
    compressor: Option<Arc<dyn Compressor>>,
    capture: Option<Arc<dyn FrameCapture>>,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
            recv_buf: Mutex::new(BytesMut::new()),
            compressor: None,
            capture: None,
        }
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_capture(mut self, capture: Arc<dyn FrameCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        stream.set_nodelay(true).ok();

        *self.stream.lock().await = Some(stream);
        self.recv_buf.lock().await.clear();

        tracing::debug!("Connected to {}", self.config.addr);
        Ok(())
    }

    /// Returns whether the connection is established.
    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Sends one request frame and reads the matching response frame.
    ///
    /// The tracing flag from the config is applied to the outgoing frame.
    pub async fn call(&self, mut frame: Frame) -> Result<Response, ClientError> {
        if self.config.tracing {
            frame.flags = frame.flags.with_tracing();
        }
        let encoded = frame.encode()?;

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;

        self.record(&frame, &encoded);
        tracing::debug!(
            opcode = frame.opcode,
            bytes = encoded.len(),
            "Sending request frame"
        );
        stream.write_all(&encoded).await.map_err(ClientError::Io)?;

        let reply = tokio::time::timeout(self.config.request_timeout, self.read_frame(stream))
            .await
            .map_err(|_| {
                tracing::debug!("Request timed out");
                ClientError::Timeout
            })??;

        tracing::debug!(
            opcode = reply.opcode,
            bytes = reply.body.len(),
            "Received response frame"
        );

        let reply = self.decompress_if_needed(reply)?;
        Ok(Response::decode(&reply)?)
    }

    /// Reads socket data until a complete frame can be decoded.
    async fn read_frame(&self, stream: &mut TcpStream) -> Result<Frame, ClientError> {
        let mut recv_buf = self.recv_buf.lock().await;
        let mut chunk = vec![0u8; self.config.read_buffer_size];

        loop {
            if let Some(frame) = Frame::decode(&mut recv_buf)? {
                if let Some(ref capture) = self.capture {
                    let encoded = frame.encode()?;
                    if let Err(e) = capture.capture(&frame.header(), &encoded) {
                        tracing::warn!("Frame capture failed: {}", e);
                    }
                }
                return Ok(frame);
            }

            let n = stream.read(&mut chunk).await.map_err(ClientError::Io)?;
            if n == 0 {
                tracing::debug!("Connection closed by server");
                return Err(ClientError::ConnectionClosed);
            }
            recv_buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn record(&self, frame: &Frame, encoded: &[u8]) {
        if let Some(ref capture) = self.capture {
            if let Err(e) = capture.capture(&frame.header(), encoded) {
                tracing::warn!("Frame capture failed: {}", e);
            }
        }
    }

    /// Swaps a compressed body for the decompressed bytes, or fails when
    /// no compressor is configured.
    fn decompress_if_needed(&self, frame: Frame) -> Result<Frame, ClientError> {
        if !frame.flags.is_compressed() {
            return Ok(frame);
        }
        let compressor = self
            .compressor
            .as_ref()
            .ok_or(ClientError::CompressionNotSupported)?;
        let body = compressor.decompress(&frame.body)?;
        Ok(Frame {
            flags: FrameFlags::from_bits(frame.flags.bits() & !FrameFlags::COMPRESSION),
            body: Bytes::from(body),
            ..frame
        })
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        if let Some(mut stream) = self.stream.lock().await.take() {
            tracing::debug!("Closing connection");
            let _ = stream.shutdown().await;
        }
        self.recv_buf.lock().await.clear();
        Ok(())
    }
}
