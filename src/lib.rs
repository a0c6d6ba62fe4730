//! # Assuan
//!
//! An implementation of the Assuan protocol: the line-oriented, text-based
//! IPC protocol used to drive interactive agents (such as PIN or passphrase
//! entry) over a pipe or local socket.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AssuanSocketServer                        │
//! │        (accept loop, bounded thread-per-connection)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      AssuanServer                            │
//! │          (read line → dispatch → stream responses)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  protocol   │          │  handlers   │
//!   │ (codec, req │          │ (registry,  │
//!   │  /response) │          │  built-ins) │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! The engine speaks to any `BufRead`/`Write` pair, so it runs equally over
//! a Unix socket or the process's standard streams. A matching
//! [`AssuanClient`] drives a server from the other end of the transport.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::AssuanClient;
pub use config::ServerConfig;
pub use error::{errcode, AssuanError, Result};
pub use protocol::{Request, Response};
pub use server::{AssuanServer, AssuanSocketServer, CommandRegistry, Session};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
