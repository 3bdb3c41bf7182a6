//! # bincql-client
//!
//! Client library for the binary CQL native protocol (v1).
//!
//! This crate provides:
//! - Async TCP client with strictly sequential request/response
//! - Lazy STARTUP negotiation before the first query
//! - Frame capture hooks for session recording
//! - Pass-through decompression hook for compressed responses

pub mod capture;
pub mod client;
pub mod connection;
pub mod error;

pub use capture::{FileCapture, FrameCapture};
pub use client::{Client, PreparedStatement};
pub use connection::{Compressor, Connection, ConnectionConfig};
pub use error::ClientError;
