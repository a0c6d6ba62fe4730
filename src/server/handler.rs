//! Command handlers and registry
//!
//! A handler is invoked with the raw parameter tail and emits an ordered,
//! finite sequence of responses through a [`ResponseSink`]; the engine
//! writes and flushes each response as it is emitted. Returning a
//! [`Fault`](crate::AssuanError::Fault) aborts the remaining sequence and
//! the fault is sent instead.
//!
//! The registry is an explicit map from canonical (lower-case) command name
//! to handler, built once at server construction. The built-in command set
//! reserved by the protocol is pre-registered and may be overridden.

use std::collections::HashMap;

use crate::config::ServerConfig;
use crate::error::{AssuanError, Result};
use crate::protocol::Response;
use crate::server::session::Session;

/// Write-side of the engine as seen by a handler
pub trait ResponseSink {
    /// Write one response line and flush it
    fn send(&mut self, response: &Response) -> Result<()>;
}

/// Everything a handler may touch: shared config, the connection's session
/// state, and the response sink.
pub struct HandlerContext<'a> {
    pub config: &'a ServerConfig,
    pub session: &'a mut Session,
    sink: &'a mut dyn ResponseSink,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        config: &'a ServerConfig,
        session: &'a mut Session,
        sink: &'a mut dyn ResponseSink,
    ) -> Self {
        Self {
            config,
            session,
            sink,
        }
    }

    /// Emit one response; it is written and flushed before this returns
    pub fn reply(&mut self, response: &Response) -> Result<()> {
        self.sink.send(response)
    }
}

/// A command handler
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut HandlerContext<'_>, parameters: Option<&str>) -> Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&mut HandlerContext<'_>, Option<&str>) -> Result<()> + Send + Sync,
{
    fn handle(&self, ctx: &mut HandlerContext<'_>, parameters: Option<&str>) -> Result<()> {
        self(ctx, parameters)
    }
}

/// Mapping from canonical command name to handler
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl CommandRegistry {
    /// An empty registry (no commands, not even the built-ins)
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the protocol's built-in command set:
    /// BYE, RESET, OPTION, and the reserved no-ops END, HELP, QUIT,
    /// CANCEL, AUTH.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("bye", handle_bye as HandlerFn);
        registry.register("reset", handle_reset as HandlerFn);
        registry.register("option", handle_option as HandlerFn);
        registry.register("end", handle_reserved as HandlerFn);
        registry.register("help", handle_reserved as HandlerFn);
        registry.register("quit", handle_quit as HandlerFn);
        registry.register("cancel", handle_reserved as HandlerFn);
        registry.register("auth", handle_reserved as HandlerFn);
        registry
    }

    /// Register a handler under a command name (case-insensitive);
    /// replaces any previous handler for that name
    pub fn register<H>(&mut self, name: &str, handler: H)
    where
        H: Handler + 'static,
    {
        self.handlers
            .insert(name.to_ascii_lowercase(), Box::new(handler));
    }

    /// Look up the handler for a canonical command name
    pub fn get(&self, canonical_name: &str) -> Option<&dyn Handler> {
        self.handlers.get(canonical_name).map(Box::as_ref)
    }

    /// The registered command names, in no particular order
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

type HandlerFn = fn(&mut HandlerContext<'_>, Option<&str>) -> Result<()>;

// -----------------------------------------------------------------------------
// Built-in commands
// -----------------------------------------------------------------------------

fn handle_bye(ctx: &mut HandlerContext<'_>, _parameters: Option<&str>) -> Result<()> {
    if ctx.config.single_request {
        ctx.session.request_stop();
    }
    ctx.reply(&Response::ok_with("closing connection"))
}

fn handle_reset(ctx: &mut HandlerContext<'_>, _parameters: Option<&str>) -> Result<()> {
    ctx.session.reset();
    Ok(())
}

fn handle_reserved(_ctx: &mut HandlerContext<'_>, _parameters: Option<&str>) -> Result<()> {
    Err(AssuanError::reserved_command())
}

/// QUIT keeps the historic dual behavior: when honored it emits
/// `OK stopping the server` and stops the engine, then still reports the
/// reserved-command fault. Peers may depend on either half.
fn handle_quit(ctx: &mut HandlerContext<'_>, _parameters: Option<&str>) -> Result<()> {
    if ctx.config.listen_to_quit {
        ctx.session.request_stop();
        ctx.reply(&Response::ok_with("stopping the server"))?;
    }
    Err(AssuanError::reserved_command())
}

fn handle_option(ctx: &mut HandlerContext<'_>, parameters: Option<&str>) -> Result<()> {
    let parameters = parameters.ok_or_else(AssuanError::invalid_parameter)?;
    let (name, value) = parse_option(parameters)?;
    if !ctx.config.is_valid_option(&name) {
        if ctx.config.strict_options {
            return Err(AssuanError::unknown_option());
        }
        tracing::debug!(option = %name, "skipping unknown option");
    } else {
        ctx.session.set_option(name, value);
    }
    ctx.reply(&Response::ok())
}

/// Parse an `OPTION` argument: optional leading dashes (at most two), a key
/// token, an optional separator (spaces or `=`), and an optional value with
/// surrounding spaces trimmed. A value without any separator is a fault.
fn parse_option(arg: &str) -> Result<(String, Option<String>)> {
    let mut rest = arg;
    for _ in 0..2 {
        rest = rest.strip_prefix('-').unwrap_or(rest);
    }

    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len());
    if end == 0 {
        return Err(AssuanError::invalid_parameter());
    }
    let name = &rest[..end];

    let mut tail = &rest[end..];
    let had_space = tail.starts_with(' ');
    tail = tail.trim_start_matches(' ');
    let had_equal = tail.starts_with('=');
    if had_equal {
        tail = tail[1..].trim_start_matches(' ');
    }
    let value = tail.trim_end_matches(' ');

    if !value.is_empty() && !had_space && !had_equal {
        // need either space or equal to separate the value
        return Err(AssuanError::invalid_parameter());
    }

    let value = if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    };
    Ok((name.to_string(), value))
}
