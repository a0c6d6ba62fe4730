//! Server Module
//!
//! The per-connection protocol engine and the socket server that runs one
//! engine per accepted connection under a bounded worker pool.

mod engine;
mod handler;
mod session;
mod socket;

pub use engine::AssuanServer;
pub use handler::{CommandRegistry, Handler, HandlerContext, ResponseSink};
pub use session::Session;
pub use socket::AssuanSocketServer;
