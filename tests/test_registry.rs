//! Integration tests for `SessionRegistry`

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{fake_builder, fake_builder_with, fake_options, init_logging};
use kodegen_gdb::{
    CommandStatus, DebuggerError, SessionId, SessionRegistry, SessionState, StartSessionRequest,
};

async fn registry_with_session(
    options: kodegen_gdb::DebuggerOptions,
) -> (SessionRegistry, SessionId) {
    let registry = SessionRegistry::new(options);
    let id = registry
        .create(StartSessionRequest::default())
        .await
        .unwrap();
    (registry, id)
}

#[tokio::test]
async fn test_start_run_terminate_scenario() {
    init_logging();
    let (registry, id) = registry_with_session(fake_options()).await;

    for cmd in ["file ./a.out", "break main", "run", "bt"] {
        let result = registry.submit(&id, cmd, None).await.unwrap();
        assert_eq!(result.status, CommandStatus::Ok, "{cmd}");
        assert_eq!(result.output, format!("echo: {cmd}"));
    }

    let listed = registry.list(false);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].commands_executed, 4);
    assert_eq!(listed[0].state, SessionState::Ready);

    let response = registry.terminate(&id).await.unwrap();
    assert_eq!(response.final_state, SessionState::Terminated);
    assert!(!response.already_ended);
    assert_eq!(response.commands_executed, 4);

    assert!(registry.list(false).is_empty());
    assert_eq!(registry.live_count(), 0);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    init_logging();
    let registry = SessionRegistry::new(fake_options());
    let missing = SessionId::new("does-not-exist");

    let started = Instant::now();
    let err = registry.submit(&missing, "print 1", None).await.unwrap_err();
    assert!(matches!(err, DebuggerError::NotFound(_)));
    assert!(started.elapsed() < Duration::from_millis(100));

    assert!(matches!(
        registry.terminate(&missing).await,
        Err(DebuggerError::NotFound(_))
    ));
    assert!(matches!(
        registry.interrupt(&missing),
        Err(DebuggerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_terminate_twice_reports_already_ended() {
    init_logging();
    let (registry, id) = registry_with_session(fake_options()).await;

    let session = registry.get(&id).unwrap();
    let in_flight = session.enqueue("sleep 5", None);
    let queued: Vec<_> = (0..3)
        .map(|i| session.enqueue(format!("cmd {i}"), None))
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let first = registry.terminate(&id).await.unwrap();
    assert!(!first.already_ended);
    assert_eq!(first.final_state, SessionState::Terminated);

    assert_eq!(in_flight.await.unwrap().status, CommandStatus::SessionGone);
    for rx in queued {
        assert_eq!(rx.await.unwrap().status, CommandStatus::SessionGone);
    }

    let second = registry.terminate(&id).await.unwrap();
    assert!(second.already_ended);
    assert_eq!(second.final_state, SessionState::Terminated);

    assert!(registry.list(false).iter().all(|s| s.session_id != id));
    let ended = registry.list(true);
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].state, SessionState::Terminated);
    assert!(ended[0].ended_at.is_some());
}

#[tokio::test]
async fn test_crashed_session_is_gone_then_not_found() {
    init_logging();
    let options = fake_builder()
        .ended_retention(Duration::from_millis(300))
        .build();
    let (registry, id) = registry_with_session(options).await;

    let result = registry.submit(&id, "crash", None).await.unwrap();
    assert_eq!(result.status, CommandStatus::SessionGone);

    // The crash monitor retires the session shortly after
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.live_count(), 0);
    let err = registry.submit(&id, "print 1", None).await.unwrap_err();
    assert!(err.is_session_gone());

    let listed = registry.list(true);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].state, SessionState::Crashed);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let err = registry.submit(&id, "print 1", None).await.unwrap_err();
    assert!(matches!(err, DebuggerError::NotFound(_)));
    assert!(registry.list(true).is_empty());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    init_logging();
    let registry = Arc::new(SessionRegistry::new(fake_options()));
    let a = registry
        .create(StartSessionRequest::default())
        .await
        .unwrap();
    let b = registry
        .create(StartSessionRequest::default())
        .await
        .unwrap();

    let slow = {
        let registry = Arc::clone(&registry);
        let a = a.clone();
        tokio::spawn(async move { registry.submit(&a, "sleep 1", None).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let quick = registry.submit(&b, "print 1", None).await.unwrap();
    assert_eq!(quick.output, "echo: print 1");
    assert!(started.elapsed() < Duration::from_millis(500));

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.status, CommandStatus::Ok);
    assert_eq!(slow.output, "slept 1");

    // Terminating one session leaves the other usable
    registry.terminate(&a).await.unwrap();
    let result = registry.submit(&b, "print 2", None).await.unwrap();
    assert_eq!(result.output, "echo: print 2");

    registry.shutdown().await;
    assert_eq!(registry.live_count(), 0);
}

#[tokio::test]
async fn test_max_sessions_is_enforced() {
    init_logging();
    let options = fake_builder().max_sessions(1).build();
    let (registry, first) = registry_with_session(options).await;

    let err = registry
        .create(StartSessionRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DebuggerError::MaxSessionsReached(1)));

    registry.terminate(&first).await.unwrap();
    registry
        .create(StartSessionRequest::default())
        .await
        .unwrap();
    registry.shutdown().await;
}

#[tokio::test]
async fn test_missing_debugger_fails_to_spawn() {
    init_logging();
    let registry = SessionRegistry::new(fake_options());
    let err = registry
        .create(StartSessionRequest {
            debugger_path: Some("/nonexistent/bin/gdb".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DebuggerError::Spawn(_)));
    assert!(registry.list(true).is_empty());
}

#[tokio::test]
async fn test_silent_debugger_times_out_at_startup() {
    init_logging();
    let options = fake_builder_with("sleep 5")
        .startup_timeout(Duration::from_millis(300))
        .build();
    let registry = SessionRegistry::new(options);

    let started = Instant::now();
    let err = registry
        .create(StartSessionRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DebuggerError::Spawn(ref msg) if msg.contains("prompt")));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(registry.list(true).is_empty());
}

#[tokio::test]
async fn test_early_exit_reports_output() {
    init_logging();
    let registry = SessionRegistry::new(fake_builder_with("echo bye; exit 1").build());

    let err = registry
        .create(StartSessionRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DebuggerError::Spawn(ref msg) if msg.contains("bye")));
    assert!(matches!(err, DebuggerError::Spawn(ref msg) if msg.contains("exit status: 1")));
    assert!(matches!(err, DebuggerError::Spawn(ref msg) if msg.starts_with("/bin/sh")));
}

#[tokio::test]
async fn test_idle_sessions_are_closed() {
    init_logging();
    let options = fake_builder()
        .idle_timeout(Duration::from_millis(200))
        .build();
    let (registry, id) = registry_with_session(options).await;

    let result = registry.submit(&id, "print 1", None).await.unwrap();
    assert!(result.is_ok());

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(registry.live_count(), 0);
    let err = registry.submit(&id, "print 2", None).await.unwrap_err();
    assert!(err.is_session_gone());
}

#[tokio::test]
async fn test_interrupt_through_registry() {
    init_logging();
    let registry = Arc::new(SessionRegistry::new(fake_options()));
    let id = registry
        .create(StartSessionRequest::default())
        .await
        .unwrap();

    let running = {
        let registry = Arc::clone(&registry);
        let id = id.clone();
        tokio::spawn(async move { registry.submit(&id, "sleep 5", None).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    registry.interrupt(&id).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("interrupted command must complete")
        .unwrap()
        .unwrap();
    assert!(result.output.contains("interrupted"));

    registry.shutdown().await;
}

#[tokio::test]
async fn test_working_directory_override() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let registry = SessionRegistry::new(fake_options());

    let id = registry
        .create(StartSessionRequest {
            working_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .await
        .unwrap();

    let summary = registry.get(&id).unwrap().summary();
    assert_eq!(summary.working_directory, dir.path());

    registry.shutdown().await;
}
