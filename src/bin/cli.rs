//! Assuan CLI client
//!
//! Connects to an Assuan server, sends one command, and prints every
//! response line.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use assuan::{AssuanClient, Request};

/// Assuan CLI
#[derive(Parser, Debug)]
#[command(name = "assuan-cli")]
#[command(about = "Send one command to an Assuan server")]
#[command(version)]
struct Args {
    /// Unix socket path of the server
    #[arg(short, long, default_value = "./assuan.sock")]
    socket: PathBuf,

    /// Command to send (e.g. GETINFO)
    command: String,

    /// Command parameters, joined with spaces
    parameters: Vec<String>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> assuan::Result<()> {
    let mut client = AssuanClient::connect(&args.socket)?;
    client.read_greeting()?;

    let request = if args.parameters.is_empty() {
        Request::new(args.command.clone())
    } else {
        Request::with_parameters(args.command.clone(), args.parameters.join(" "))
    };

    let (responses, data) = client.make_request(&request)?;
    for response in &responses {
        println!("{}", response.to_line());
    }
    if let Some(data) = data {
        println!("{}", String::from_utf8_lossy(&data));
    }

    client.bye()
}
