//! Protocol Engine Tests
//!
//! Drive the per-connection engine over in-memory transports and check the
//! exact byte stream it produces.

use std::sync::Arc;

use assuan::server::{AssuanServer, CommandRegistry, HandlerContext};
use assuan::{AssuanError, Response, Result, ServerConfig};

const GREETING: &str = "OK Your orders please\n";

fn engine<'a>(
    config: ServerConfig,
    registry: CommandRegistry,
    input: &'a [u8],
    output: &'a mut Vec<u8>,
) -> AssuanServer<&'a [u8], &'a mut Vec<u8>> {
    AssuanServer::new(Arc::new(config), Arc::new(registry), input, output)
}

fn run_script(config: ServerConfig, input: &[u8]) -> String {
    let mut output = Vec::new();
    engine(config, CommandRegistry::with_builtins(), input, &mut output)
        .run()
        .unwrap();
    String::from_utf8(output).unwrap()
}

// =============================================================================
// Greeting and Framing
// =============================================================================

#[test]
fn test_greeting_then_clean_eof() {
    let output = run_script(ServerConfig::default(), b"");
    assert_eq!(output, GREETING);
}

#[test]
fn test_line_too_long_is_recoverable() {
    let mut input = vec![b'A'; 1100];
    input.push(b'\n');
    input.extend_from_slice(b"END\n");

    let output = run_script(ServerConfig::default(), &input);
    assert_eq!(
        output,
        format!("{GREETING}ERR 263 Line too long\nERR 175 Unknown command (reserved)\n")
    );
}

#[test]
fn test_line_just_over_limit_faults_before_parsing() {
    // 1001 bytes plus newline: passes the raw framing check, rejected by
    // the request parser's own length guard
    let mut input = vec![b'B'; 1001];
    input.push(b'\n');
    let output = run_script(ServerConfig::default(), &input);
    assert_eq!(output, format!("{GREETING}ERR 263 Line too long\n"));
}

#[test]
fn test_unterminated_final_line_is_invalid_request() {
    let output = run_script(ServerConfig::default(), b"BYE");
    assert_eq!(output, format!("{GREETING}ERR 170 Invalid request\n"));
}

#[test]
fn test_leading_space_is_invalid_request() {
    let output = run_script(ServerConfig::default(), b" invalid\n");
    assert_eq!(output, format!("{GREETING}ERR 170 Invalid request\n"));
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_unknown_command() {
    let output = run_script(ServerConfig::default(), b"FROB\n");
    assert_eq!(output, format!("{GREETING}ERR 175 Unknown command\n"));
}

#[test]
fn test_empty_registry_knows_nothing() {
    let mut output = Vec::new();
    engine(
        ServerConfig::default(),
        CommandRegistry::new(),
        b"BYE\n",
        &mut output,
    )
    .run()
    .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("{GREETING}ERR 175 Unknown command\n")
    );
}

#[test]
fn test_dispatch_is_case_insensitive() {
    let output = run_script(ServerConfig::default(), b"bYe\n");
    assert_eq!(output, format!("{GREETING}OK closing connection\n"));
}

#[test]
fn test_reserved_commands_fault() {
    for command in ["END", "HELP", "CANCEL", "AUTH"] {
        let output = run_script(ServerConfig::default(), format!("{command}\n").as_bytes());
        assert_eq!(
            output,
            format!("{GREETING}ERR 175 Unknown command (reserved)\n"),
            "command: {command}"
        );
    }
}

// =============================================================================
// BYE / QUIT
// =============================================================================

#[test]
fn test_bye_keeps_connection_open_in_multi_request_mode() {
    let output = run_script(ServerConfig::default(), b"BYE\nEND\n");
    assert_eq!(
        output,
        format!("{GREETING}OK closing connection\nERR 175 Unknown command (reserved)\n")
    );
}

#[test]
fn test_bye_stops_in_single_request_mode() {
    let config = ServerConfig::builder().single_request(true).build();
    // the second command must never be dispatched
    let output = run_script(config, b"BYE\nEND\n");
    assert_eq!(output, format!("{GREETING}OK closing connection\n"));
}

#[test]
fn test_quit_is_reserved_by_default() {
    let output = run_script(ServerConfig::default(), b"QUIT\n");
    assert_eq!(
        output,
        format!("{GREETING}ERR 175 Unknown command (reserved)\n")
    );
}

#[test]
fn test_quit_dual_behavior_when_honored() {
    let config = ServerConfig::builder().listen_to_quit(true).build();
    // OK immediately followed by the reserved-command fault, then stop
    let output = run_script(config, b"QUIT\nEND\n");
    assert_eq!(
        output,
        format!("{GREETING}OK stopping the server\nERR 175 Unknown command (reserved)\n")
    );
}

// =============================================================================
// OPTION
// =============================================================================

fn option_config() -> ServerConfig {
    ServerConfig::builder().valid_option("my-op").build()
}

#[test]
fn test_option_forms_store_values() {
    let cases: [(&[u8], Option<&str>); 4] = [
        (b"OPTION my-op = 1 \n", Some("1")),
        (b"OPTION my-op 2\n", Some("2")),
        (b"OPTION --my-op 3\n", Some("3")),
        (b"OPTION my-op\n", None),
    ];
    for (input, expected) in cases {
        let mut output = Vec::new();
        let mut server = engine(option_config(), CommandRegistry::with_builtins(), input, &mut output);
        server.run().unwrap();
        assert_eq!(
            server.session().option("my-op"),
            Some(&expected.map(str::to_string)),
            "input: {:?}",
            String::from_utf8_lossy(input)
        );
        drop(server);
        assert_eq!(String::from_utf8(output).unwrap(), format!("{GREETING}OK\n"));
    }
}

#[test]
fn test_option_unknown_name_is_a_fault_in_strict_mode() {
    let output = run_script(option_config(), b"OPTION inv\n");
    assert_eq!(output, format!("{GREETING}ERR 174 Unknown option\n"));
}

#[test]
fn test_option_without_separator_is_invalid_parameter() {
    let output = run_script(option_config(), b"OPTION in|valid\n");
    assert_eq!(output, format!("{GREETING}ERR 90 Invalid parameter\n"));
}

#[test]
fn test_option_without_argument_is_invalid_parameter() {
    let output = run_script(option_config(), b"OPTION\n");
    assert_eq!(output, format!("{GREETING}ERR 90 Invalid parameter\n"));
}

#[test]
fn test_option_unknown_name_is_skipped_in_lenient_mode() {
    let config = ServerConfig::builder()
        .valid_option("my-op")
        .strict_options(false)
        .build();
    let mut output = Vec::new();
    let mut server = engine(config, CommandRegistry::with_builtins(), b"OPTION inv 9\n", &mut output);
    server.run().unwrap();
    // accepted on the wire, but not stored
    assert_eq!(server.session().option("inv"), None);
    drop(server);
    assert_eq!(String::from_utf8(output).unwrap(), format!("{GREETING}OK\n"));
}

// =============================================================================
// RESET
// =============================================================================

#[test]
fn test_reset_clears_options_silently() {
    let mut output = Vec::new();
    let mut server = engine(
        option_config(),
        CommandRegistry::with_builtins(),
        b"OPTION my-op=1\nRESET\n",
        &mut output,
    );
    server.run().unwrap();
    assert!(server.session().options().is_empty());
    drop(server);
    // one OK for the OPTION, nothing for the RESET
    assert_eq!(String::from_utf8(output).unwrap(), format!("{GREETING}OK\n"));
}

// =============================================================================
// Custom Handlers
// =============================================================================

fn echo_handler(ctx: &mut HandlerContext<'_>, parameters: Option<&str>) -> Result<()> {
    ctx.reply(&Response::data(parameters.unwrap_or("").to_string()))?;
    ctx.reply(&Response::ok())
}

fn failing_handler(_ctx: &mut HandlerContext<'_>, _parameters: Option<&str>) -> Result<()> {
    Err(AssuanError::Internal("backing store exploded".into()))
}

fn status_then_fault_handler(ctx: &mut HandlerContext<'_>, _parameters: Option<&str>) -> Result<()> {
    ctx.reply(&Response::status("WORKING", "step 1"))?;
    Err(AssuanError::fault(999, "Custom fault"))
}

#[test]
fn test_registered_handler_streams_responses() {
    let mut registry = CommandRegistry::with_builtins();
    registry.register("echo", echo_handler);

    let mut output = Vec::new();
    engine(ServerConfig::default(), registry, b"ECHO hello there\n", &mut output)
        .run()
        .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("{GREETING}D hello there\nOK\n")
    );
}

#[test]
fn test_internal_handler_error_is_masked() {
    let mut registry = CommandRegistry::with_builtins();
    registry.register("boom", failing_handler);

    let mut output = Vec::new();
    engine(ServerConfig::default(), registry, b"BOOM\nEND\n", &mut output)
        .run()
        .unwrap();
    // the connection survives the fault
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!(
            "{GREETING}ERR 1 Unspecific Assuan server fault\nERR 175 Unknown command (reserved)\n"
        )
    );
}

#[test]
fn test_partial_emission_then_fault_preserves_order() {
    let mut registry = CommandRegistry::with_builtins();
    registry.register("work", status_then_fault_handler);

    let mut output = Vec::new();
    engine(ServerConfig::default(), registry, b"WORK\n", &mut output)
        .run()
        .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("{GREETING}S WORKING step 1\nERR 999 Custom fault\n")
    );
}

#[test]
fn test_builtin_can_be_overridden() {
    let mut registry = CommandRegistry::with_builtins();
    registry.register("bye", echo_handler);

    let mut output = Vec::new();
    engine(ServerConfig::default(), registry, b"BYE now\n", &mut output)
        .run()
        .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("{GREETING}D now\nOK\n")
    );
}
