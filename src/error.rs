//! Error types for the Assuan protocol engine
//!
//! Provides a unified error type for all operations. Protocol faults carry
//! the numeric code that goes on the wire in an `ERR` line.

use thiserror::Error;

/// Result type alias using AssuanError
pub type Result<T> = std::result::Result<T, AssuanError>;

/// Numeric protocol error codes.
///
/// These follow the gpg-error numbering used by the reference
/// implementations, so an `ERR` line produced here is meaningful to any
/// Assuan peer.
pub mod errcode {
    /// General error (also used for unspecific server faults)
    pub const GENERAL: u32 = 1;

    /// Invalid response (raised by the client)
    pub const INVALID_RESPONSE: u32 = 76;

    /// Invalid parameter
    pub const INVALID_PARAMETER: u32 = 90;

    /// Invalid request
    pub const INVALID_REQUEST: u32 = 170;

    /// Unknown option
    pub const UNKNOWN_OPTION: u32 = 174;

    /// Unknown command (also used for protocol-reserved commands)
    pub const UNKNOWN_COMMAND: u32 = 175;

    /// IPC accept call failed (raised by the client on end-of-stream)
    pub const ACCEPT_FAILED: u32 = 258;

    /// Line passed to IPC too long
    pub const LINE_TOO_LONG: u32 = 263;

    /// No input source for IPC
    pub const NO_INPUT: u32 = 278;

    /// No output source for IPC
    pub const NO_OUTPUT: u32 = 279;
}

/// Unified error type for Assuan operations
#[derive(Debug, Error)]
pub enum AssuanError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Faults
    // -------------------------------------------------------------------------
    /// A protocol-level fault, reported to the peer verbatim as
    /// `ERR code message`.
    #[error("{code} {message}")]
    Fault { code: u32, message: String },

    // -------------------------------------------------------------------------
    // Internal Errors
    // -------------------------------------------------------------------------
    /// Unexpected failure inside a handler. Converted at the dispatch
    /// boundary to `ERR 1 Unspecific Assuan server fault`; the original
    /// text never crosses the wire.
    #[error("internal error: {0}")]
    Internal(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssuanError {
    /// Create a protocol fault with an explicit code and message
    pub fn fault(code: u32, message: impl Into<String>) -> Self {
        AssuanError::Fault {
            code,
            message: message.into(),
        }
    }

    /// `ERR 170 Invalid request`
    pub fn invalid_request() -> Self {
        Self::fault(errcode::INVALID_REQUEST, "Invalid request")
    }

    /// `ERR 90 Invalid parameter`
    pub fn invalid_parameter() -> Self {
        Self::fault(errcode::INVALID_PARAMETER, "Invalid parameter")
    }

    /// `ERR 174 Unknown option`
    pub fn unknown_option() -> Self {
        Self::fault(errcode::UNKNOWN_OPTION, "Unknown option")
    }

    /// `ERR 175 Unknown command`
    pub fn unknown_command() -> Self {
        Self::fault(errcode::UNKNOWN_COMMAND, "Unknown command")
    }

    /// `ERR 175 Unknown command (reserved)` for the command names the
    /// protocol reserves (END, HELP, CANCEL, AUTH, and QUIT)
    pub fn reserved_command() -> Self {
        Self::fault(errcode::UNKNOWN_COMMAND, "Unknown command (reserved)")
    }

    /// `ERR 263 Line too long`
    pub fn line_too_long() -> Self {
        Self::fault(errcode::LINE_TOO_LONG, "Line too long")
    }

    /// `ERR 76 Invalid response` (raised by the client)
    pub fn invalid_response() -> Self {
        Self::fault(errcode::INVALID_RESPONSE, "Invalid response")
    }

    /// The numeric code of a protocol fault, if this is one
    pub fn code(&self) -> Option<u32> {
        match self {
            AssuanError::Fault { code, .. } => Some(*code),
            _ => None,
        }
    }
}
