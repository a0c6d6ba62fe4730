//! Socket Server Tests
//!
//! End-to-end tests over a real Unix socket: one engine per connection,
//! bounded worker pool, shed-load drop policy.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use assuan::errcode;
use assuan::protocol::encode_str;
use assuan::server::HandlerContext;
use assuan::{
    AssuanClient, AssuanError, AssuanSocketServer, CommandRegistry, Request, Response, Result,
    ServerConfig,
};

fn echo_handler(ctx: &mut HandlerContext<'_>, parameters: Option<&str>) -> Result<()> {
    let text = assuan::protocol::decode_str(parameters.unwrap_or(""))?;
    for chunk in Response::data_chunks(&text) {
        ctx.reply(&chunk)?;
    }
    ctx.reply(&Response::ok())
}

fn start_server(max_connections: usize) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assuan.sock");

    let config = ServerConfig::builder()
        .name("test-server")
        .valid_option("display")
        .max_connections(max_connections)
        .build();
    let mut registry = CommandRegistry::with_builtins();
    registry.register("echo", echo_handler);

    let server = AssuanSocketServer::bind(&path, config, registry).unwrap();
    thread::spawn(move || {
        let _ = server.run();
    });
    (dir, path)
}

// =============================================================================
// Basic Protocol Flow
// =============================================================================

#[test]
fn test_greeting_and_option_negotiation() {
    let (_dir, path) = start_server(4);

    let mut client = AssuanClient::connect(&path).unwrap();
    let greeting = client.read_greeting().unwrap();
    assert_eq!(greeting, Response::ok_with("Your orders please"));

    let (responses, data) = client
        .make_request(&Request::with_parameters("OPTION", "display :0"))
        .unwrap();
    assert_eq!(responses, vec![Response::ok()]);
    assert_eq!(data, None);
}

#[test]
fn test_unknown_command_surfaces_as_fault() {
    let (_dir, path) = start_server(4);

    let mut client = AssuanClient::connect(&path).unwrap();
    client.read_greeting().unwrap();

    let err = client.make_request(&Request::new("FROB")).unwrap_err();
    assert_eq!(err.code(), Some(errcode::UNKNOWN_COMMAND));
}

#[test]
fn test_echo_round_trip_with_reserved_bytes() {
    let (_dir, path) = start_server(4);

    let mut client = AssuanClient::connect(&path).unwrap();
    client.read_greeting().unwrap();

    let value = "line one\nline two 50%";
    let request = Request::with_parameters("ECHO", encode_str(value));
    let (responses, data) = client.make_request(&request).unwrap();

    assert_eq!(data.as_deref(), Some(value.as_bytes()));
    assert_eq!(responses.last(), Some(&Response::ok()));
}

#[test]
fn test_bye_completes() {
    let (_dir, path) = start_server(4);

    let mut client = AssuanClient::connect(&path).unwrap();
    client.read_greeting().unwrap();
    client.bye().unwrap();
}

// =============================================================================
// Connection Independence
// =============================================================================

#[test]
fn test_connections_do_not_share_state() {
    let (_dir, path) = start_server(4);

    let mut first = AssuanClient::connect(&path).unwrap();
    let mut second = AssuanClient::connect(&path).unwrap();
    first.read_greeting().unwrap();
    second.read_greeting().unwrap();

    first
        .make_request(&Request::with_parameters("OPTION", "display :0"))
        .unwrap();
    // a fault on one connection must not disturb the other
    let err = second.make_request(&Request::new("END")).unwrap_err();
    assert_eq!(err.code(), Some(errcode::UNKNOWN_COMMAND));

    let (responses, _) = first.make_request(&Request::new("ECHO")).unwrap();
    assert_eq!(responses.last(), Some(&Response::ok()));
}

// =============================================================================
// Shed-Load Policy
// =============================================================================

#[test]
fn test_overflow_connection_is_dropped_without_protocol_bytes() {
    let (_dir, path) = start_server(1);

    // occupy the only worker slot
    let mut held = AssuanClient::connect(&path).unwrap();
    held.read_greeting().unwrap();

    // the second concurrent connection is dropped at the transport level
    let mut rejected = AssuanClient::connect(&path).unwrap();
    let err = rejected.read_response().unwrap_err();
    match err {
        AssuanError::Fault { code, .. } => assert_eq!(code, errcode::ACCEPT_FAILED),
        other => panic!("expected end-of-stream fault, got {other:?}"),
    }

    // free the slot and let the worker finish
    drop(held);
    thread::sleep(Duration::from_millis(300));

    // the next connection is reaped in and served
    let mut fresh = AssuanClient::connect(&path).unwrap();
    let greeting = fresh.read_greeting().unwrap();
    assert_eq!(greeting, Response::ok_with("Your orders please"));
}
