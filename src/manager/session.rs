//! Debugger session
//!
//! A [`DebuggerSession`] aggregates one debugger process, the worker task
//! that owns it, and the metadata reported by `list sessions`. Callers only
//! ever talk to the worker through the session's queue.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::background::{WorkerContext, spawn_command_worker};
use super::commands::CommandRequest;
use super::helpers::millis;
use crate::error::{DebuggerError, Result};
use crate::output::{Boundary, BoundaryMatcher};
use crate::transport::subprocess::send_interrupt;
use crate::transport::{ReadOutcome, SpawnConfig, SubprocessTransport, Transport};
use crate::types::command::{CommandResult, CommandStatus};
use crate::types::identifiers::SessionId;
use crate::types::options::DebuggerOptions;
use crate::types::session::{SessionState, SessionSummary};

/// Output reported for a command that contains a line break
pub const MULTI_LINE_COMMAND: &str = "command must be a single line; submit each line separately";

/// State the session handle and its worker both update
pub(super) struct SessionShared {
    executable_path: Mutex<Option<PathBuf>>,
    commands_executed: AtomicU64,
    last_activity: Mutex<Instant>,
    ended_at: Mutex<Option<DateTime<Utc>>>,
}

impl SessionShared {
    pub(super) fn new() -> Self {
        Self {
            executable_path: Mutex::new(None),
            commands_executed: AtomicU64::new(0),
            last_activity: Mutex::new(Instant::now()),
            ended_at: Mutex::new(None),
        }
    }

    /// Count a command written to the process
    pub(super) fn record_command(&self) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
        *self.last_activity.lock() = Instant::now();
    }

    /// Stamp the end time (first call wins)
    pub(super) fn mark_ended(&self) {
        self.ended_at.lock().get_or_insert_with(Utc::now);
    }
}

/// One managed debugger process plus its command queue
pub struct DebuggerSession {
    id: SessionId,
    debugger_path: PathBuf,
    working_directory: PathBuf,
    started_at: DateTime<Utc>,
    created: Instant,
    pid: Option<u32>,
    default_timeout: Duration,
    queue_tx: mpsc::UnboundedSender<CommandRequest>,
    state_rx: watch::Receiver<SessionState>,
    shared: Arc<SessionShared>,
    cancel: CancellationToken,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DebuggerSession {
    /// Spawn a debugger, wait for its first prompt, and start the worker
    ///
    /// # Errors
    /// Returns `Spawn` if the process cannot be started, exits, or shows no
    /// prompt within the startup timeout; `InvalidPattern` if a configured
    /// pattern does not compile.
    pub async fn start(
        id: SessionId,
        options: &DebuggerOptions,
        config: SpawnConfig,
    ) -> Result<Self> {
        let matcher = BoundaryMatcher::from_options(options)?;
        let mut transport = SubprocessTransport::spawn(&config)?;

        let mut startup = String::new();
        let outcome = transport
            .read_until(
                &mut startup,
                |buffer| matcher.classify(buffer, false).is_complete(),
                options.startup_timeout,
            )
            .await;

        let consumed = match (outcome, matcher.classify(&startup, false)) {
            (
                ReadOutcome::Matched,
                Boundary::CompleteOk { consumed, .. } | Boundary::CompleteError { consumed, .. },
            ) => consumed,
            (ReadOutcome::TimedOut, _) => {
                let _ = transport.terminate().await;
                return Err(DebuggerError::spawn(format!(
                    "{} printed no `{}` prompt within {}s",
                    transport.program().display(),
                    matcher.prompt(),
                    options.startup_timeout.as_secs_f32()
                )));
            }
            _ => {
                // Reaping records the exit status
                let _ = transport.terminate().await;
                let mut message = format!(
                    "{} exited before its first prompt",
                    transport.program().display()
                );
                if let Some(status) = transport.exit_status() {
                    message.push_str(&format!(" ({status})"));
                }
                let tail = startup.trim();
                if !tail.is_empty() {
                    message.push_str(&format!(": {tail}"));
                }
                return Err(DebuggerError::spawn(message));
            }
        };

        let banner = startup[..consumed].trim();
        if !banner.is_empty() {
            log::debug!("[{id}] startup output: {banner}");
        }
        let initial_idle = startup[consumed..].to_string();

        Ok(Self::with_transport(id, options, config, matcher, transport, initial_idle))
    }

    /// Wrap an already-ready transport in a session and start its worker
    fn with_transport<T>(
        id: SessionId,
        options: &DebuggerOptions,
        config: SpawnConfig,
        matcher: BoundaryMatcher,
        transport: T,
        initial_idle: String,
    ) -> Self
    where
        T: Transport + 'static,
    {
        let pid = transport.pid();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Ready);
        let shared = Arc::new(SessionShared::new());
        let cancel = CancellationToken::new();

        let ctx = WorkerContext {
            session_id: id.clone(),
            matcher,
            max_buffer_size: options.max_buffer_size,
            state_tx,
            shared: Arc::clone(&shared),
            cancel: cancel.clone(),
        };
        let worker = spawn_command_worker(transport, queue_rx, ctx, initial_idle);

        log::info!(
            "[{id}] session ready: {} (pid {:?}) in {}",
            config.program.display(),
            pid,
            config.working_dir.display()
        );

        Self {
            id,
            debugger_path: config.program,
            working_directory: config.working_dir,
            started_at: Utc::now(),
            created: Instant::now(),
            pid,
            default_timeout: options.command_timeout,
            queue_tx,
            state_rx,
            shared,
            cancel,
            worker: tokio::sync::Mutex::new(Some(worker)),
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Watch channel following the session's state
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Debugger process id while the session is live
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        if self.state().is_ended() { None } else { self.pid }
    }

    /// Working directory of the debugger process
    #[must_use]
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Target executable loaded into the debugger, if any
    #[must_use]
    pub fn executable_path(&self) -> Option<PathBuf> {
        self.shared.executable_path.lock().clone()
    }

    /// Record the target executable after a successful load
    pub fn set_executable_path(&self, path: impl Into<PathBuf>) {
        *self.shared.executable_path.lock() = Some(path.into());
    }

    /// Commands written to the process so far
    #[must_use]
    pub fn commands_executed(&self) -> u64 {
        self.shared.commands_executed.load(Ordering::Relaxed)
    }

    /// Time since the last command was written (or since start)
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.shared.last_activity.lock().elapsed()
    }

    /// Milliseconds since the session was created
    #[must_use]
    pub fn runtime_ms(&self) -> u64 {
        millis(self.created.elapsed())
    }

    /// Timeout applied when a caller gives none
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Snapshot for `list sessions`
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            state: self.state(),
            executable_path: self.executable_path(),
            debugger_path: self.debugger_path.clone(),
            working_directory: self.working_directory.clone(),
            pid: self.pid(),
            started_at: self.started_at,
            commands_executed: self.commands_executed(),
            ended_at: *self.shared.ended_at.lock(),
        }
    }

    /// Queue a command and return immediately with its result slot
    ///
    /// A session that has ended resolves the slot at once with
    /// `SessionGone`. A command spanning several lines would produce several
    /// prompts, so it resolves as `Error` without being written.
    pub fn enqueue(
        &self,
        command: impl Into<String>,
        timeout: Option<Duration>,
    ) -> oneshot::Receiver<CommandResult> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let (request, result_rx) = CommandRequest::new(command.into(), timeout);

        if request.command.contains(['\n', '\r']) {
            log::debug!("[{}] rejected multi-line command", self.id);
            request.resolve(
                CommandStatus::Error,
                MULTI_LINE_COMMAND.to_string(),
                String::new(),
            );
        } else if self.state().is_ended() {
            request.resolve_gone();
        } else if let Err(mpsc::error::SendError(request)) = self.queue_tx.send(request) {
            request.resolve_gone();
        }

        result_rx
    }

    /// Run one command and wait for its result
    ///
    /// Suspends only the caller; other sessions keep running.
    pub async fn submit(
        &self,
        command: impl Into<String>,
        timeout: Option<Duration>,
    ) -> CommandResult {
        let started = Instant::now();
        self.enqueue(command, timeout)
            .await
            .unwrap_or_else(|_| CommandResult::session_gone("", millis(started.elapsed())))
    }

    /// Send SIGINT to the debugger without going through the queue
    ///
    /// # Errors
    /// Returns `SessionGone` if the session has ended, `Transport` if the
    /// signal could not be delivered.
    pub fn interrupt(&self) -> Result<()> {
        let state = self.state();
        if state.is_ended() {
            return Err(DebuggerError::session_gone(self.id.as_str(), state.as_str()));
        }
        let pid = self
            .pid
            .ok_or_else(|| DebuggerError::transport("debugger pid unknown"))?;
        log::debug!("[{}] interrupting pid {pid}", self.id);
        send_interrupt(pid)
    }

    /// Stop the worker, fail queued requests with `SessionGone`, and reap
    /// the process
    ///
    /// Idempotent: concurrent and later calls return once the first has
    /// finished its work.
    pub async fn terminate(&self) {
        self.cancel.cancel();
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            if let Err(e) = handle.await {
                log::warn!("[{}] worker task failed: {e}", self.id);
            }
        }
    }
}

impl Drop for DebuggerSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Ended session snapshot, retained for lookups after termination or crash
#[derive(Debug, Clone)]
pub(super) struct EndedSession {
    /// Final summary (state is `terminated` or `crashed`)
    pub summary: SessionSummary,

    /// Total runtime in milliseconds
    pub runtime_ms: u64,

    /// When the session was retired (wall-clock time)
    pub ended_at: DateTime<Utc>,
}

impl EndedSession {
    pub(super) fn capture(session: &DebuggerSession) -> Self {
        let summary = session.summary();
        Self {
            ended_at: summary.ended_at.unwrap_or_else(Utc::now),
            runtime_ms: session.runtime_ms(),
            summary,
        }
    }

    /// Whether the retention period has run out
    pub(super) fn is_expired(&self, retention: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.ended_at);
        age.to_std().is_ok_and(|age| age >= retention)
    }
}
