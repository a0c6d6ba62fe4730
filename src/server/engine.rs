//! Protocol engine
//!
//! Owns the read/dispatch/write loop of one connection: read a line, build
//! a request, look up a handler, stream its responses, and convert faults
//! to `ERR` lines. All faults are local to the current request; only
//! end-of-stream or an explicit stop ends the loop.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{AssuanError, Result};
use crate::protocol::{Request, Response, MAX_LINE};
use crate::server::handler::{CommandRegistry, HandlerContext, ResponseSink};
use crate::server::session::Session;

/// Protocol engine for a single connection.
///
/// Generic over the transport: a buffered reader and a writer. The engine
/// is strictly sequential; it blocks on the next input line and never
/// overlaps reads with writes.
pub struct AssuanServer<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    config: Arc<ServerConfig>,
    registry: Arc<CommandRegistry>,
    session: Session,
    peer: String,
}

impl AssuanServer<BufReader<Stdin>, Stdout> {
    /// Engine bound to the process's standard streams (single-connection
    /// mode)
    pub fn over_stdio(config: Arc<ServerConfig>, registry: Arc<CommandRegistry>) -> Self {
        Self::new(config, registry, BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> AssuanServer<R, W> {
    pub fn new(
        config: Arc<ServerConfig>,
        registry: Arc<CommandRegistry>,
        reader: R,
        writer: W,
    ) -> Self {
        Self {
            reader,
            writer,
            config,
            registry,
            session: Session::new(),
            peer: "local".to_string(),
        }
    }

    /// Tag this connection for logging
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// The connection's session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the engine until the peer closes the stream or a handler sets
    /// the stop flag.
    ///
    /// A peer that disappears mid-write (broken pipe, connection reset) is
    /// treated as a clean shutdown, matching end-of-stream on the read
    /// side.
    pub fn run(&mut self) -> Result<()> {
        match self.serve() {
            Err(e) if is_disconnect(&e) => {
                tracing::debug!(peer = %self.peer, "peer disconnected: {e}");
                Ok(())
            }
            result => result,
        }
    }

    fn serve(&mut self) -> Result<()> {
        self.session.reset();
        tracing::debug!(peer = %self.peer, server = %self.config.name, "connection started");
        self.send(&Response::ok_with("Your orders please"))?;

        while !self.session.stop_requested() {
            let mut line = Vec::new();
            let read = self.reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                // EOF: clean shutdown, no error emitted
                break;
            }
            // MAX_LINE excludes the [CR]LF termination
            if line.len() > MAX_LINE + 2 {
                tracing::warn!(peer = %self.peer, len = line.len(), "line too long");
                self.send(&Response::from_error(&AssuanError::line_too_long()))?;
                continue;
            }
            if line.last() != Some(&b'\n') {
                tracing::debug!(peer = %self.peer, "C: {:?} (unterminated)", String::from_utf8_lossy(&line));
                self.send(&Response::from_error(&AssuanError::invalid_request()))?;
                continue;
            }
            line.pop();
            tracing::debug!(peer = %self.peer, "C: {}", String::from_utf8_lossy(&line));

            let request = match Request::parse(&line) {
                Ok(request) => request,
                Err(e) => {
                    self.send(&Response::from_error(&e))?;
                    continue;
                }
            };
            self.dispatch(&request)?;
        }

        tracing::debug!(peer = %self.peer, "connection closed");
        Ok(())
    }

    /// Look up and invoke the handler for one request, converting faults
    /// and internal errors to `ERR` responses. Only I/O errors propagate.
    fn dispatch(&mut self, request: &Request) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let handler = match registry.get(&request.canonical_command()) {
            Some(handler) => handler,
            None => {
                tracing::warn!(peer = %self.peer, command = %request.command, "unknown command");
                return self.send(&Response::from_error(&AssuanError::unknown_command()));
            }
        };

        let result = {
            let mut sink = WireSink {
                writer: &mut self.writer,
                peer: &self.peer,
            };
            let mut ctx = HandlerContext::new(&self.config, &mut self.session, &mut sink);
            handler.handle(&mut ctx, request.parameters.as_deref())
        };

        match result {
            Ok(()) => Ok(()),
            Err(fault @ AssuanError::Fault { .. }) => {
                self.send(&Response::from_error(&fault))
            }
            Err(AssuanError::Io(e)) => Err(e.into()),
            Err(e) => {
                tracing::error!(
                    peer = %self.peer,
                    command = %request.command,
                    "handler failed: {e}"
                );
                self.send(&Response::from_error(&e))
            }
        }
    }

    fn send(&mut self, response: &Response) -> Result<()> {
        WireSink {
            writer: &mut self.writer,
            peer: &self.peer,
        }
        .send(response)
    }
}

/// Writes responses straight to the transport, flushing after every line
/// so a synchronously reading peer never stalls.
struct WireSink<'a, W: Write> {
    writer: &'a mut W,
    peer: &'a str,
}

impl<W: Write> ResponseSink for WireSink<'_, W> {
    fn send(&mut self, response: &Response) -> Result<()> {
        let line = response.to_line();
        tracing::debug!(peer = %self.peer, "S: {line}");
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Whether an error means the peer went away rather than a server problem
fn is_disconnect(error: &AssuanError) -> bool {
    match error {
        AssuanError::Io(e) => matches!(
            e.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}
