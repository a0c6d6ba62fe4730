//! Percent-encoding codec
//!
//! Reversible mapping between raw byte strings and line-safe text. Only the
//! bytes that would break line framing are escaped: `%` (0x25), `\n` (0x0A)
//! and `\r` (0x0D) become `%` followed by two uppercase hex digits. Decoding
//! accepts lowercase hex digits as well.

use crate::error::{AssuanError, Result};

/// Maximum length of a protocol line, excluding the terminating newline
pub const MAX_LINE: usize = 1000;

/// Bytes that must be escaped before they may appear on a protocol line
const RESERVED: [u8; 3] = [b'%', b'\n', b'\r'];

/// Percent-encode a byte string.
///
/// The output contains no raw `%`, `\n` or `\r`; all other bytes pass
/// through unchanged, so encoding valid UTF-8 yields valid UTF-8.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        if RESERVED.contains(&byte) {
            out.extend_from_slice(to_hex(byte).as_bytes());
        } else {
            out.push(byte);
        }
    }
    out
}

/// Percent-encode a string
pub fn encode_str(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for ch in data.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            _ => out.push(ch),
        }
    }
    out
}

/// Decode a percent-encoded byte string.
///
/// Every `%XY` triplet is replaced by the byte `0xXY`. A trailing `%` or a
/// `%` not followed by two hex digits is a decode fault.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'%' {
            if i + 2 >= data.len() {
                return Err(AssuanError::invalid_parameter());
            }
            let hi = hex_value(data[i + 1])?;
            let lo = hex_value(data[i + 2])?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Decode a percent-encoded string.
///
/// Fails if the decoded bytes are not valid UTF-8; use [`decode`] for
/// payloads that may contain arbitrary bytes.
pub fn decode_str(data: &str) -> Result<String> {
    let bytes = decode(data.as_bytes())?;
    String::from_utf8(bytes).map_err(|_| AssuanError::invalid_parameter())
}

/// Encode a single byte as a `%XY` unit with uppercase hex digits
pub fn to_hex(byte: u8) -> String {
    format!("%{byte:02X}")
}

/// Decode a single already-isolated `%XY` unit to its byte value
pub fn from_hex(unit: &str) -> Result<u8> {
    let digits = unit
        .strip_prefix('%')
        .ok_or_else(AssuanError::invalid_parameter)?;
    if digits.len() != 2 {
        return Err(AssuanError::invalid_parameter());
    }
    u8::from_str_radix(digits, 16).map_err(|_| AssuanError::invalid_parameter())
}

fn hex_value(byte: u8) -> Result<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(AssuanError::invalid_parameter()),
    }
}
