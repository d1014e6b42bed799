//! # Error Types
//!
//! Error handling for the wire codec, framing, registry and stream transport.
//!
//! Every failure surfaces as a [`ProtocolError`]. Variants fall into classes so
//! callers can react programmatically without matching every variant:
//!
//! ## Error Categories
//! - **Validation**: out-of-range values, oversized strings or packets, bad
//!   compression thresholds. Raised while building or serializing; the input
//!   must be corrected.
//! - **Format**: malformed or truncated wire data found while decoding.
//! - **Resolution**: no packet schema for a (state, direction, id) key.
//! - **Connection**: the peer closed the stream mid-frame, or the connection
//!   was closed locally.
//! - **I/O** and **Config**: underlying stream and configuration failures.
//!
//! ## Example Usage
//! ```rust
//! use mcproto::core::varint::VarInt;
//! use mcproto::core::WireType;
//! use mcproto::error::ErrorKind;
//!
//! let err = VarInt::decode(&[0x80, 0x80], 0).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Format);
//! ```

use crate::protocol::{Direction, ProtocolState};
use std::io;
use thiserror::Error;

/// Static log messages shared by the transport and compression paths.
pub mod constants {
    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed by peer";
    pub const ERR_CLOSED_LOCALLY: &str = "Operation on a locally closed connection";

    /// Compression errors
    pub const ERR_COMPRESSION_FAILED: &str = "Compression failed";
    pub const ERR_DECOMPRESSION_FAILED: &str = "Decompression failed";
}

/// Coarse classification of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Format,
    Resolution,
    Connection,
    Io,
    Config,
}

/// Which part of a frame was being read when the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    Length,
    Body,
}

impl std::fmt::Display for ReadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadPhase::Length => f.write_str("packet length"),
            ReadPhase::Body => f.write_str("packet data"),
        }
    }
}

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ----- validation -----
    #[error("{type_name} value out of range: {value} (allowed {min}..={max})")]
    ValueOutOfRange {
        type_name: &'static str,
        value: i128,
        min: i128,
        max: i128,
    },

    #[error("String too long: {code_units} UTF-16 code units (max {max})")]
    StringTooLong { code_units: usize, max: usize },

    #[error("UTF-8 encoded length {bytes} exceeds maximum {max}")]
    StringBytesTooLong { bytes: usize, max: usize },

    #[error("Length prefix exceeds {max} bytes: {actual}")]
    LengthPrefixOverflow { actual: usize, max: usize },

    #[error("Uncompressed packet too large: {size} bytes (max {max})")]
    OversizedPacket { size: usize, max: usize },

    #[error("Compression threshold must be >= 0 or disabled, got {0}")]
    InvalidCompressionThreshold(i32),

    #[error("Missing field `{field}` for packet {packet}")]
    MissingField {
        packet: &'static str,
        field: &'static str,
    },

    #[error("Field `{field}` of packet {packet} expects {expected}, got {actual}")]
    FieldTypeMismatch {
        packet: &'static str,
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid value for field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Compression failed")]
    CompressionFailure,

    // ----- format -----
    #[error("{type_name} is too long (max {max_bytes} bytes)")]
    ValueTooLong {
        type_name: &'static str,
        max_bytes: usize,
    },

    #[error("Incomplete {type_name} bytes")]
    IncompleteValue { type_name: &'static str },

    #[error("{type_name} does not fit its domain")]
    ValueOverflow { type_name: &'static str },

    #[error("Not enough bytes to decode {type_name}: need {needed}, have {available}")]
    InsufficientBytes {
        type_name: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Packet length VarInt exceeds 3 bytes")]
    LengthPrefixTooLong,

    #[error("Packet length too large: {length} (max {max})")]
    FrameTooLarge { length: usize, max: usize },

    #[error("Truncated frame: declared {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    #[error("Decompressed length mismatch: declared {declared}, got {actual}")]
    DecompressedLengthMismatch { declared: usize, actual: usize },

    #[error("Decompression failed")]
    DecompressionFailure,

    // ----- resolution -----
    #[error("No packet found for {state}.{direction}.{id:#04x}")]
    UnknownPacket {
        state: ProtocolState,
        direction: Direction,
        id: u32,
    },

    #[error("Duplicate packet registration for {state}.{direction}.{id:#04x}")]
    DuplicatePacket {
        state: ProtocolState,
        direction: Direction,
        id: u32,
    },

    // ----- connection -----
    #[error("Socket closed while reading {phase} (expected {expected} bytes, received {received})")]
    ConnectionClosed {
        phase: ReadPhase,
        expected: usize,
        received: usize,
    },

    #[error("Connection was closed locally")]
    ClosedLocally,

    // ----- configuration -----
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use ProtocolError::*;
        match self {
            Io(e) if e.kind() == io::ErrorKind::WriteZero => ErrorKind::Connection,
            Io(_) => ErrorKind::Io,
            ValueOutOfRange { .. }
            | StringTooLong { .. }
            | StringBytesTooLong { .. }
            | LengthPrefixOverflow { .. }
            | OversizedPacket { .. }
            | InvalidCompressionThreshold(_)
            | MissingField { .. }
            | FieldTypeMismatch { .. }
            | InvalidField { .. }
            | CompressionFailure => ErrorKind::Validation,
            ValueTooLong { .. }
            | IncompleteValue { .. }
            | ValueOverflow { .. }
            | InsufficientBytes { .. }
            | InvalidUtf8(_)
            | LengthPrefixTooLong
            | FrameTooLarge { .. }
            | TruncatedFrame { .. }
            | DecompressedLengthMismatch { .. }
            | DecompressionFailure => ErrorKind::Format,
            UnknownPacket { .. } | DuplicatePacket { .. } => ErrorKind::Resolution,
            ConnectionClosed { .. } | ClosedLocally => ErrorKind::Connection,
            ConfigError(_) => ErrorKind::Config,
        }
    }

    pub fn is_validation_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_format_error(&self) -> bool {
        self.kind() == ErrorKind::Format
    }

    pub fn is_resolution_error(&self) -> bool {
        self.kind() == ErrorKind::Resolution
    }

    /// True when the peer went away (or we closed) rather than sending bad data.
    pub fn is_connection_error(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
