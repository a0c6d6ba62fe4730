//! Assuan demo server binary
//!
//! Serves a small command set (NOP, ECHO, GETINFO) over a Unix socket or,
//! with `--stdio`, over the process's standard streams.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use assuan::protocol::{decode_str, Response};
use assuan::server::{AssuanServer, AssuanSocketServer, CommandRegistry, HandlerContext};
use assuan::{AssuanError, Result, ServerConfig};

/// Assuan demo server
#[derive(Parser, Debug)]
#[command(name = "assuan-server")]
#[command(about = "Assuan protocol demo server")]
#[command(version)]
struct Args {
    /// Unix socket path to listen on
    #[arg(short, long, default_value = "./assuan.sock")]
    socket: PathBuf,

    /// Serve a single connection over stdin/stdout instead of a socket
    #[arg(long)]
    stdio: bool,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "10")]
    max_connections: usize,

    /// Option names accepted by the OPTION command
    #[arg(long = "allow-option")]
    allow_options: Vec<String>,

    /// Skip unknown options instead of rejecting them
    #[arg(long)]
    lenient: bool,

    /// Stop after the first BYE (single-request mode)
    #[arg(long)]
    single_request: bool,

    /// Honor the QUIT command
    #[arg(long)]
    listen_to_quit: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,assuan=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("Assuan demo server v{}", assuan::VERSION);

    let config = ServerConfig::builder()
        .name("assuan-demo")
        .valid_options(args.allow_options.clone())
        .strict_options(!args.lenient)
        .single_request(args.single_request)
        .listen_to_quit(args.listen_to_quit)
        .max_connections(args.max_connections)
        .build();

    let mut registry = CommandRegistry::with_builtins();
    registry.register("nop", handle_nop);
    registry.register("echo", handle_echo);
    registry.register("getinfo", handle_getinfo);

    let result = if args.stdio {
        tracing::info!("serving on stdin/stdout");
        AssuanServer::over_stdio(Arc::new(config), Arc::new(registry)).run()
    } else {
        serve_socket(&args, config, registry)
    };

    if let Err(e) = result {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }

    tracing::info!("server stopped");
}

fn serve_socket(args: &Args, config: ServerConfig, registry: CommandRegistry) -> Result<()> {
    // a previous run may have left the socket file behind
    if args.socket.exists() {
        std::fs::remove_file(&args.socket)?;
    }
    tracing::info!("listening on {}", args.socket.display());
    let server = AssuanSocketServer::bind(&args.socket, config, registry)?;
    server.run()
}

// -----------------------------------------------------------------------------
// Demo handlers
// -----------------------------------------------------------------------------

fn handle_nop(ctx: &mut HandlerContext<'_>, _parameters: Option<&str>) -> Result<()> {
    ctx.reply(&Response::ok())
}

/// Return the (decoded) parameters as data lines
fn handle_echo(ctx: &mut HandlerContext<'_>, parameters: Option<&str>) -> Result<()> {
    let text = decode_str(parameters.unwrap_or(""))?;
    for chunk in Response::data_chunks(&text) {
        ctx.reply(&chunk)?;
    }
    ctx.reply(&Response::ok())
}

fn handle_getinfo(ctx: &mut HandlerContext<'_>, parameters: Option<&str>) -> Result<()> {
    let payload = match parameters {
        Some("version") => assuan::VERSION.to_string(),
        Some("pid") => std::process::id().to_string(),
        _ => return Err(AssuanError::invalid_parameter()),
    };
    for chunk in Response::data_chunks(&payload) {
        ctx.reply(&chunk)?;
    }
    ctx.reply(&Response::ok())
}
