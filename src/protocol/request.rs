//! Request parsing
//!
//! A request is a single line: a command token optionally followed by one or
//! more spaces and a parameter tail. Parameters are kept raw; decoding is
//! each handler's responsibility, because some commands (notably `OPTION`)
//! take parameters that are not percent-encoded.

use crate::error::{AssuanError, Result};
use crate::protocol::codec::MAX_LINE;

/// A parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command token; matched case-insensitively at dispatch
    pub command: String,

    /// Raw (still encoded) parameter tail, if any
    pub parameters: Option<String>,
}

impl Request {
    /// Create a request without parameters
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameters: None,
        }
    }

    /// Create a request with a wire-ready parameter tail.
    ///
    /// The caller is responsible for percent-encoding parameters that may
    /// contain reserved bytes.
    pub fn with_parameters(command: impl Into<String>, parameters: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameters: Some(parameters.into()),
        }
    }

    /// Parse a request from one line (newline already stripped).
    ///
    /// The command token must be non-empty and consist of word characters
    /// (ASCII letters, digits, `_`); anything else is an `Invalid request`
    /// fault. A parameter tail must be separated from the command by at
    /// least one space.
    pub fn parse(line: &[u8]) -> Result<Self> {
        if line.len() > MAX_LINE {
            return Err(AssuanError::line_too_long());
        }
        let text = std::str::from_utf8(line).map_err(|_| AssuanError::invalid_request())?;

        let end = text
            .find(|c: char| !is_word(c))
            .unwrap_or(text.len());
        if end == 0 {
            return Err(AssuanError::invalid_request());
        }
        let command = &text[..end];

        let tail = &text[end..];
        if tail.is_empty() {
            return Ok(Request::new(command));
        }
        if !tail.starts_with(' ') {
            return Err(AssuanError::invalid_request());
        }
        let parameters = tail.trim_start_matches(' ');
        if parameters.is_empty() {
            return Ok(Request::new(command));
        }
        Ok(Request::with_parameters(command, parameters))
    }

    /// Command name folded to the canonical (lower) case used for dispatch
    pub fn canonical_command(&self) -> String {
        self.command.to_ascii_lowercase()
    }

    /// Render the request as one wire line, without the trailing newline
    pub fn to_line(&self) -> String {
        match &self.parameters {
            Some(parameters) => format!("{} {}", self.command, parameters),
            None => self.command.clone(),
        }
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
