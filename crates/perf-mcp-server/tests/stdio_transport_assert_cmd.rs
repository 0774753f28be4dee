use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

/// Feeds newline-delimited JSON-RPC requests on stdin and closes it,
/// which ends the stdio transport's read loop and lets the process exit.
fn run_requests(lines: &[&str]) -> assert_cmd::assert::Assert {
    let mut input = lines.join("\n");
    input.push('\n');
    Command::cargo_bin("perf-mcp-server").unwrap().arg("--transport").arg("stdio").write_stdin(input).assert()
}

#[test]
fn initialize_then_eof_reports_server_info_and_exits_cleanly() {
    run_requests(&[r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#])
        .success()
        .stdout(predicate::str::contains("perf-mcp-server"))
        .stdout(predicate::str::contains("\"protocolVersion\""));
}

#[test]
fn tools_list_enumerates_the_closed_tool_surface() {
    run_requests(&[r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#])
        .success()
        .stdout(predicate::str::contains("perf_triage"))
        .stdout(predicate::str::contains("perf_capabilities"));
}

#[test]
fn tools_call_round_trips_an_envelope_over_the_wire() {
    run_requests(&[r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"perf_capabilities","arguments":{}}}"#])
        .success()
        .stdout(predicate::str::contains("\"structuredContent\""))
        .stdout(predicate::str::contains("perf_capabilities"));
}

#[test]
fn a_malformed_json_line_gets_a_parse_error_and_the_process_keeps_serving() {
    run_requests(&["not json at all", r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#])
        .success()
        .stdout(predicate::str::contains("\"code\":-32700"))
        .stdout(predicate::str::contains("\"jsonrpc\":\"2.0\""));
}

#[test]
fn a_notification_draws_no_response_line() {
    // One notification (no id, `notifications/` prefix) followed by one
    // real request; stdout must contain exactly one JSON-RPC response.
    run_requests(&[r#"{"jsonrpc":"2.0","method":"notifications/initialized","params":{}}"#, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#])
        .success()
        .stdout(predicate::function(|out: &str| out.lines().filter(|l| !l.trim().is_empty()).count() == 1));
}
