//! Protocol Module
//!
//! Defines the Assuan wire format: one command or response per line, lines
//! terminated by `\n`.
//!
//! ## Wire Format
//!
//! ### Request (client to server)
//! ```text
//! COMMAND[ parameters]\n
//! ```
//!
//! ### Response (server to client)
//! ```text
//! OK[ text]\n
//! ERR code[ text]\n
//! D payload\n
//! S keyword[ text]\n
//! # comment\n
//! INQUIRE keyword[ parameters]\n
//! ```
//!
//! A line may be at most [`MAX_LINE`] bytes, excluding the terminating
//! newline. Reserved bytes (`%`, `\n`, `\r`) are transported percent-encoded
//! as `%` plus two uppercase hex digits.

mod codec;
mod request;
mod response;

pub use codec::{decode, decode_str, encode, encode_str, from_hex, to_hex, MAX_LINE};
pub use request::Request;
pub use response::{Response, MAX_DATA};
