//! Response model
//!
//! A typed server response with a wire-format renderer and parser. `D`
//! payloads are carried already percent-encoded: the engine never re-encodes
//! data lines, and producers must split oversized payloads across multiple
//! `D` responses (see [`Response::data_chunks`]).

use crate::error::{AssuanError, Result};
use crate::protocol::codec::{self, MAX_LINE};

/// Maximum encoded payload bytes on one `D` line (`"D "` prefix accounted)
pub const MAX_DATA: usize = MAX_LINE - 2;

/// A server response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK [text]` — success, terminal
    Ok(Option<String>),

    /// `ERR code [text]` — failure, terminal
    Err { code: u32, message: Option<String> },

    /// `D payload` — one line of already percent-encoded data
    Data(String),

    /// `S keyword [text]` — status update, informational
    Status {
        keyword: String,
        text: Option<String>,
    },

    /// `# comment` — ignorable
    Comment(String),

    /// `INQUIRE keyword [parameters]` — server asks for data mid-command,
    /// terminal from the client's point of view
    Inquire {
        keyword: String,
        parameters: Option<String>,
    },
}

impl Response {
    /// Plain `OK`
    pub fn ok() -> Self {
        Response::Ok(None)
    }

    /// `OK` with human-readable text
    pub fn ok_with(text: impl Into<String>) -> Self {
        Response::Ok(Some(text.into()))
    }

    /// `ERR` with a numeric code and short message
    pub fn err(code: u32, message: impl Into<String>) -> Self {
        Response::Err {
            code,
            message: Some(message.into()),
        }
    }

    /// One `D` line; `payload` must already be percent-encoded
    pub fn data(payload: impl Into<String>) -> Self {
        Response::Data(payload.into())
    }

    /// `S keyword text`
    pub fn status(keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Response::Status {
            keyword: keyword.into(),
            text: Some(text.into()),
        }
    }

    /// `# comment`
    pub fn comment(text: impl Into<String>) -> Self {
        Response::Comment(text.into())
    }

    /// `INQUIRE keyword`
    pub fn inquire(keyword: impl Into<String>) -> Self {
        Response::Inquire {
            keyword: keyword.into(),
            parameters: None,
        }
    }

    /// Build the `ERR` response for a fault.
    ///
    /// Non-fault errors are masked as `ERR 1 Unspecific Assuan server
    /// fault` so no internal detail crosses the protocol boundary.
    pub fn from_error(error: &AssuanError) -> Self {
        match error {
            AssuanError::Fault { code, message } => Response::err(*code, message.clone()),
            _ => Response::err(crate::error::errcode::GENERAL, "Unspecific Assuan server fault"),
        }
    }

    /// Split a logical data value into as many `D` responses as needed.
    ///
    /// The text is percent-encoded first, then cut so each line stays within
    /// [`MAX_LINE`]. Cuts never land inside a `%XY` escape, so every chunk
    /// is independently well-formed.
    pub fn data_chunks(data: &str) -> Vec<Response> {
        let encoded = codec::encode_str(data);
        let mut chunks = Vec::new();
        let mut rest = encoded.as_str();
        while !rest.is_empty() {
            let mut cut = rest.len().min(MAX_DATA);
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            // back up if the cut would split an escape triplet
            let bytes = rest.as_bytes();
            while cut > 0
                && (bytes[cut - 1] == b'%' || (cut >= 2 && bytes[cut - 2] == b'%'))
            {
                cut -= 1;
            }
            chunks.push(Response::Data(rest[..cut].to_string()));
            rest = &rest[cut..];
        }
        chunks
    }

    /// Whether this response ends a request/response cycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Response::Ok(_) | Response::Err { .. } | Response::Inquire { .. }
        )
    }

    /// Render the response as one wire line, without the trailing newline.
    ///
    /// Text fields are percent-encoded on the way out; `D` payloads are
    /// written as-is.
    pub fn to_line(&self) -> String {
        match self {
            Response::Ok(None) => "OK".to_string(),
            Response::Ok(Some(text)) => format!("OK {}", codec::encode_str(text)),
            Response::Err { code, message: None } => format!("ERR {code}"),
            Response::Err {
                code,
                message: Some(message),
            } => format!("ERR {} {}", code, codec::encode_str(message)),
            Response::Data(payload) => format!("D {payload}"),
            Response::Status { keyword, text: None } => format!("S {keyword}"),
            Response::Status {
                keyword,
                text: Some(text),
            } => format!("S {} {}", keyword, codec::encode_str(text)),
            Response::Comment(text) => format!("# {}", codec::encode_str(text)),
            Response::Inquire {
                keyword,
                parameters: None,
            } => format!("INQUIRE {keyword}"),
            Response::Inquire {
                keyword,
                parameters: Some(parameters),
            } => format!("INQUIRE {} {}", keyword, codec::encode_str(parameters)),
        }
    }

    /// Parse a response from one line (newline already stripped).
    ///
    /// Used by the client; a line that matches no response kind is an
    /// `Invalid response` fault.
    pub fn parse(line: &str) -> Result<Self> {
        if line.len() > MAX_LINE {
            return Err(AssuanError::line_too_long());
        }
        if let Some(rest) = line.strip_prefix('#') {
            let text = rest.strip_prefix(' ').unwrap_or(rest);
            return Ok(Response::Comment(codec::decode_str(text)?));
        }
        if line == "D" {
            return Ok(Response::Data(String::new()));
        }
        if let Some(payload) = line.strip_prefix("D ") {
            return Ok(Response::Data(payload.to_string()));
        }

        let (keyword, tail) = split_token(line);
        match keyword {
            "OK" => Ok(Response::Ok(decode_optional(tail)?)),
            "ERR" => parse_err(tail),
            "S" => {
                let (status, text) = split_token(tail);
                if status.is_empty() {
                    return Err(AssuanError::invalid_response());
                }
                Ok(Response::Status {
                    keyword: status.to_string(),
                    text: decode_optional(text)?,
                })
            }
            "INQUIRE" => {
                let (inquiry, parameters) = split_token(tail);
                if inquiry.is_empty() {
                    return Err(AssuanError::invalid_response());
                }
                Ok(Response::Inquire {
                    keyword: inquiry.to_string(),
                    parameters: decode_optional(parameters)?,
                })
            }
            _ => Err(AssuanError::invalid_response()),
        }
    }
}

/// Split off the first space-delimited token, trimming the separator
fn split_token(text: &str) -> (&str, &str) {
    match text.find(' ') {
        Some(at) => (&text[..at], text[at..].trim_start_matches(' ')),
        None => (text, ""),
    }
}

fn decode_optional(text: &str) -> Result<Option<String>> {
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(codec::decode_str(text)?))
    }
}

fn parse_err(tail: &str) -> Result<Response> {
    let (code, message) = split_token(tail);
    let code: u32 = code
        .parse()
        .map_err(|_| AssuanError::invalid_response())?;
    Ok(Response::Err {
        code,
        message: decode_optional(message)?,
    })
}
