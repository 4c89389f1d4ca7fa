//! CLI Integration Tests
//!
//! These tests run the `lossyrpc` binary:
//! 1. `probe` against open and closed ports
//! 2. `serve` followed by `call` against it
//! 3. Error handling for invalid arguments

use std::net::TcpListener;
use std::process::{Child, Command, Output};
use std::thread::sleep;
use std::time::{Duration, Instant};

// ============================================================================
// Test Helpers
// ============================================================================

fn lossyrpc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lossyrpc"))
}

fn run(args: &[&str]) -> Output {
    lossyrpc().args(args).output().expect("binary runs")
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Kills the child process when dropped.
struct ServeGuard(Child);

impl Drop for ServeGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn start_serve(port: u16) -> ServeGuard {
    let child = lossyrpc()
        .args(["serve", "-b", "127.0.0.1", "-p", &port.to_string()])
        .spawn()
        .expect("serve starts");
    let guard = ServeGuard(child);

    let addr = format!("127.0.0.1:{}", port);
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if run(&["probe", &addr, "--timeout-ms", "200"]).status.success() {
            return guard;
        }
        sleep(Duration::from_millis(50));
    }
    panic!("serve did not come up on {}", addr);
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_probe_closed_port_exits_nonzero() {
    let port = free_port();
    let output = run(&["probe", &format!("127.0.0.1:{}", port)]);
    assert!(!output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");
}

#[test]
fn test_serve_then_call() {
    let port = free_port();
    let _serve = start_serve(port);
    let addr = format!("127.0.0.1:{}", port);

    let output = run(&["call", &addr, "method", "-a", "[7, true]"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let reply: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reply["success"], true);
    assert_eq!(reply["Result"], serde_json::json!([-7, "Error for value 7"]));
    assert!(reply["Error"].is_null());
}

#[test]
fn test_call_unknown_operation_prints_failed_reply() {
    let port = free_port();
    let _serve = start_serve(port);

    let output = run(&["call", &format!("127.0.0.1:{}", port), "missing"]);
    assert!(output.status.success());

    let reply: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reply["success"], false);
    assert_eq!(reply["Kind"], "dispatch");
}

#[test]
fn test_call_unreachable_exits_nonzero() {
    let port = free_port();
    let output = run(&["call", &format!("127.0.0.1:{}", port), "method", "-a", "[1, false]"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_call_rejects_invalid_json_args() {
    let output = run(&["call", "127.0.0.1:1", "method", "-a", "not json"]);
    assert!(!output.status.success());
}

#[test]
fn test_unknown_subcommand() {
    let output = run(&["frobnicate"]);
    assert!(!output.status.success());
}
