//! Client error types.

use bincql_protocol::ErrorBody;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] bincql_protocol::ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("server error: {0}")]
    Server(ErrorBody),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("received a compressed frame but no compressor is configured")]
    CompressionNotSupported,

    #[error("server requires authentication via {0}")]
    AuthenticationRequired(String),
}

impl ClientError {
    /// Returns whether retrying the request could help.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::Timeout => true,
            ClientError::ConnectionClosed => true,
            _ => false,
        }
    }
}
