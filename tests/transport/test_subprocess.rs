//! Tests for `SubprocessTransport`
//!
//! Spawning, line writes, merged output, and exit detection against small
//! shell scripts.

#[path = "../common/mod.rs"]
mod common;

use std::time::{Duration, Instant};

use kodegen_gdb::transport::ReadOutcome;
use kodegen_gdb::{DebuggerError, SpawnConfig, SubprocessTransport, Transport};

fn sh(script: &str) -> SpawnConfig {
    SpawnConfig::new(
        "/bin/sh",
        vec!["-c".to_string(), script.to_string()],
        std::env::temp_dir(),
    )
}

async fn read_all(transport: &mut SubprocessTransport) -> String {
    let mut output = String::new();
    while let Some(chunk) = transport.read_chunk().await {
        output.push_str(&chunk);
    }
    output
}

#[tokio::test]
async fn test_write_line_reaches_stdin() {
    common::init_logging();
    let mut transport =
        SubprocessTransport::spawn(&sh("printf '> '; read -r l; echo \"got $l\"")).unwrap();
    assert!(transport.pid().is_some());

    let mut buffer = String::new();
    let outcome = transport
        .read_until(&mut buffer, |b| b.ends_with("> "), Duration::from_secs(5))
        .await;
    assert_eq!(outcome, ReadOutcome::Matched);

    transport.write_line("hello").await.unwrap();
    let rest = read_all(&mut transport).await;
    assert_eq!(rest, "got hello\n");
    assert!(!transport.is_alive());
}

#[tokio::test]
async fn test_stderr_is_merged_in_order() {
    common::init_logging();
    let mut transport =
        SubprocessTransport::spawn(&sh("echo one; echo two >&2; echo three")).unwrap();
    assert_eq!(read_all(&mut transport).await, "one\ntwo\nthree\n");
}

#[tokio::test]
async fn test_exit_detected_while_grandchild_holds_pipe() {
    common::init_logging();
    let mut transport = SubprocessTransport::spawn(&sh("(sleep 5) & echo bye")).unwrap();

    let started = Instant::now();
    let output = read_all(&mut transport).await;
    assert_eq!(output, "bye\n");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(transport.exit_status().is_some());
}

#[tokio::test]
async fn test_read_until_times_out() {
    common::init_logging();
    let mut transport = SubprocessTransport::spawn(&sh("sleep 5")).unwrap();

    let mut buffer = String::new();
    let outcome = transport
        .read_until(&mut buffer, |b| b.contains("never"), Duration::from_millis(200))
        .await;
    assert_eq!(outcome, ReadOutcome::TimedOut);

    transport.terminate().await.unwrap();
    assert!(!transport.is_alive());
}

#[tokio::test]
async fn test_terminate_is_idempotent() {
    common::init_logging();
    let mut transport = SubprocessTransport::spawn(&sh("while true; do sleep 1; done")).unwrap();

    transport.terminate().await.unwrap();
    transport.terminate().await.unwrap();
    assert!(transport.read_chunk().await.is_none());
    assert!(transport.write_line("print 1").await.is_err());
}

#[test]
fn test_missing_working_directory_is_rejected() {
    let config = SpawnConfig::new("/bin/sh", Vec::new(), "/nonexistent/working/dir");
    let Err(err) = SubprocessTransport::spawn(&config) else {
        panic!("spawn should fail");
    };
    assert!(matches!(err, DebuggerError::Spawn(_)));
}

#[tokio::test]
async fn test_missing_program_is_rejected() {
    let config = SpawnConfig::new("/nonexistent/gdb", Vec::new(), std::env::temp_dir());
    let Err(err) = SubprocessTransport::spawn(&config) else {
        panic!("spawn should fail");
    };
    assert!(matches!(err, DebuggerError::Spawn(_)));
}
