//! Command queue worker for debugger sessions
//!
//! One worker task per session owns the transport. It pulls requests in
//! arrival order, writes each command, reads until the boundary matcher
//! reports completion, and fills the request's result slot. While idle it
//! keeps reading so that asynchronous output is buffered rather than mixed
//! into the next command's result.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::commands::CommandRequest;
use super::helpers::{TRUNCATION_MARKER, cap_front, push_capped};
use super::session::SessionShared;
use crate::output::{Boundary, BoundaryMatcher};
use crate::transport::Transport;
use crate::types::command::CommandStatus;
use crate::types::identifiers::SessionId;
use crate::types::session::SessionState;

/// Why a worker stopped
enum Ending {
    /// Explicit termination
    Cancelled,
    /// Process exit or pipe failure
    Crashed(String),
}

/// Shared state handed to the worker task
pub(super) struct WorkerContext {
    pub session_id: SessionId,
    pub matcher: BoundaryMatcher,
    pub max_buffer_size: usize,
    pub state_tx: watch::Sender<SessionState>,
    pub shared: Arc<SessionShared>,
    pub cancel: CancellationToken,
}

/// Spawn the worker task for one session
///
/// `initial_idle` is text that followed the startup prompt.
pub(super) fn spawn_command_worker<T>(
    transport: T,
    queue: mpsc::UnboundedReceiver<CommandRequest>,
    ctx: WorkerContext,
    initial_idle: String,
) -> tokio::task::JoinHandle<()>
where
    T: Transport + 'static,
{
    let worker = CommandWorker {
        transport,
        queue,
        ctx,
        idle: initial_idle,
        drain: None,
    };
    tokio::spawn(worker.run())
}

struct CommandWorker<T> {
    transport: T,
    queue: mpsc::UnboundedReceiver<CommandRequest>,
    ctx: WorkerContext,
    /// Output seen while no command was outstanding
    idle: String,
    /// Late output of a timed-out command, discarded at its boundary
    drain: Option<String>,
}

impl<T: Transport> CommandWorker<T> {
    async fn run(mut self) {
        log::debug!("[{}] worker started", self.ctx.session_id);

        let ending = loop {
            tokio::select! {
                biased;
                () = self.ctx.cancel.cancelled() => break Ending::Cancelled,
                request = self.queue.recv() => {
                    let Some(request) = request else {
                        // Every sender is gone: the session handle was dropped
                        break Ending::Cancelled;
                    };
                    if let Err(ending) = self.execute(request).await {
                        break ending;
                    }
                }
                chunk = self.transport.read_chunk() => {
                    let Some(text) = chunk else {
                        break Ending::Crashed("debugger process exited".to_string());
                    };
                    if let Err(ending) = self.absorb_idle(&text).await {
                        break ending;
                    }
                }
            }
        };

        self.finish(ending).await;
    }

    /// Run one request through `Sending` and `AwaitingBoundary`
    async fn execute(&mut self, request: CommandRequest) -> Result<(), Ending> {
        self.set_state(SessionState::Busy);

        if self.drain.is_some() {
            match self.wait_for_drain(request.deadline).await {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!(
                        "[{}] `{}` expired while late output was draining",
                        self.ctx.session_id,
                        request.command
                    );
                    request.resolve(CommandStatus::Timeout, String::new(), String::new());
                    self.set_state(SessionState::Ready);
                    return Ok(());
                }
                Err(ending) => {
                    self.publish_end(&ending);
                    request.resolve_gone();
                    return Err(ending);
                }
            }
        }

        if Instant::now() >= request.deadline {
            request.resolve(CommandStatus::Timeout, String::new(), String::new());
            self.set_state(SessionState::Ready);
            return Ok(());
        }

        // Output that arrived before this request was dequeued is idle text
        while let Some(text) = self.transport.try_read_chunk() {
            if let Err(ending) = self.absorb_idle(&text).await {
                self.publish_end(&ending);
                request.resolve_gone();
                return Err(ending);
            }
        }

        let mut unsolicited = std::mem::take(&mut self.idle);
        // The tail of a prompt split across reads is just whitespace
        if unsolicited.trim().is_empty() {
            unsolicited.clear();
        }
        log::debug!("[{}] > {}", self.ctx.session_id, request.command);

        if let Err(e) = self.transport.write_line(&request.command).await {
            let ending = Ending::Crashed(e.to_string());
            self.publish_end(&ending);
            request.resolve(CommandStatus::SessionGone, String::new(), unsolicited);
            return Err(ending);
        }
        self.ctx.shared.record_command();

        let mut buffer = String::new();
        let mut truncated = false;

        loop {
            match self.ctx.matcher.classify(&buffer, false) {
                Boundary::CompleteOk { output, consumed } => {
                    self.complete(request, CommandStatus::Ok, output, unsolicited, truncated, &buffer[consumed..]);
                    return Ok(());
                }
                Boundary::CompleteError { output, consumed } => {
                    self.complete(request, CommandStatus::Error, output, unsolicited, truncated, &buffer[consumed..]);
                    return Ok(());
                }
                Boundary::PagerPrompt { start, end } => {
                    buffer.replace_range(start..end, "");
                    if let Err(e) = self.transport.write_line("").await {
                        let ending = Ending::Crashed(e.to_string());
                        self.publish_end(&ending);
                        request.resolve(CommandStatus::SessionGone, with_marker(buffer, truncated), unsolicited);
                        return Err(ending);
                    }
                    continue;
                }
                Boundary::Incomplete | Boundary::ProcessExited { .. } => {}
            }

            tokio::select! {
                biased;
                () = self.ctx.cancel.cancelled() => {
                    self.publish_end(&Ending::Cancelled);
                    request.resolve(CommandStatus::SessionGone, with_marker(buffer, truncated), unsolicited);
                    return Err(Ending::Cancelled);
                }
                () = tokio::time::sleep_until(request.deadline) => {
                    log::warn!(
                        "[{}] `{}` timed out after {} ms; draining late output",
                        self.ctx.session_id,
                        request.command,
                        request.elapsed_ms()
                    );
                    let partial = trim_partial(&buffer).to_string();
                    request.resolve(CommandStatus::Timeout, with_marker(partial, truncated), unsolicited);
                    self.drain = Some(buffer);
                    self.set_state(SessionState::Ready);
                    return Ok(());
                }
                chunk = self.transport.read_chunk() => match chunk {
                    Some(text) => {
                        buffer.push_str(&text);
                        if cap_front(&mut buffer, self.ctx.max_buffer_size) > 0 {
                            truncated = true;
                        }
                    }
                    None => {
                        let (status, output) = match self.ctx.matcher.classify(&buffer, true) {
                            Boundary::CompleteOk { output, .. } => (CommandStatus::Ok, output),
                            Boundary::CompleteError { output, .. } => (CommandStatus::Error, output),
                            Boundary::ProcessExited { output } => (CommandStatus::SessionGone, output),
                            Boundary::Incomplete | Boundary::PagerPrompt { .. } => {
                                (CommandStatus::SessionGone, trim_partial(&buffer).to_string())
                            }
                        };
                        let ending = Ending::Crashed("debugger process exited".to_string());
                        self.publish_end(&ending);
                        request.resolve(status, with_marker(output, truncated), unsolicited);
                        return Err(ending);
                    }
                }
            }
        }
    }

    /// Resolve a completed command and keep whatever followed its prompt
    fn complete(
        &mut self,
        request: CommandRequest,
        status: CommandStatus,
        output: String,
        unsolicited: String,
        truncated: bool,
        leftover: &str,
    ) {
        log::debug!(
            "[{}] < {} ({} bytes, {} ms)",
            self.ctx.session_id,
            status.as_str(),
            output.len(),
            request.elapsed_ms()
        );
        if !leftover.is_empty() {
            push_capped(&mut self.idle, leftover, self.ctx.max_buffer_size);
        }
        request.resolve(status, with_marker(output, truncated), unsolicited);
        self.set_state(SessionState::Ready);
    }

    /// Route text read while no command is outstanding
    async fn absorb_idle(&mut self, text: &str) -> Result<(), Ending> {
        match self.drain.as_mut() {
            Some(drain) => {
                drain.push_str(text);
                cap_front(drain, self.ctx.max_buffer_size);
                self.step_drain().await?;
            }
            None => {
                if push_capped(&mut self.idle, text, self.ctx.max_buffer_size) > 0 {
                    log::warn!(
                        "[{}] idle output exceeded {} bytes; oldest text dropped",
                        self.ctx.session_id,
                        self.ctx.max_buffer_size
                    );
                }
            }
        }
        Ok(())
    }

    /// Wait for the drain to reach a boundary; false if `deadline` passes first
    async fn wait_for_drain(&mut self, deadline: Instant) -> Result<bool, Ending> {
        loop {
            if self.step_drain().await? {
                return Ok(true);
            }

            tokio::select! {
                biased;
                () = self.ctx.cancel.cancelled() => return Err(Ending::Cancelled),
                () = tokio::time::sleep_until(deadline) => return Ok(false),
                chunk = self.transport.read_chunk() => match chunk {
                    Some(text) => {
                        if let Some(drain) = self.drain.as_mut() {
                            drain.push_str(&text);
                            cap_front(drain, self.ctx.max_buffer_size);
                        }
                    }
                    None => return Err(Ending::Crashed("debugger process exited".to_string())),
                }
            }
        }
    }

    /// Classify the drain buffer once; true when draining is over
    async fn step_drain(&mut self) -> Result<bool, Ending> {
        loop {
            let Some(drain) = self.drain.as_mut() else {
                return Ok(true);
            };

            match self.ctx.matcher.classify(drain, false) {
                Boundary::CompleteOk { consumed, .. } | Boundary::CompleteError { consumed, .. } => {
                    log::warn!(
                        "[{}] discarded {} bytes of late output",
                        self.ctx.session_id,
                        consumed
                    );
                    let leftover = drain.split_off(consumed);
                    self.drain = None;
                    if !leftover.is_empty() {
                        push_capped(&mut self.idle, &leftover, self.ctx.max_buffer_size);
                    }
                    return Ok(true);
                }
                Boundary::PagerPrompt { start, end } => {
                    drain.replace_range(start..end, "");
                    if let Err(e) = self.transport.write_line("").await {
                        return Err(Ending::Crashed(e.to_string()));
                    }
                }
                Boundary::Incomplete | Boundary::ProcessExited { .. } => return Ok(false),
            }
        }
    }

    /// Publish the terminal state, fail every outstanding request, and reap
    async fn finish(mut self, ending: Ending) {
        match &ending {
            Ending::Cancelled => log::info!("[{}] session terminated", self.ctx.session_id),
            Ending::Crashed(reason) => {
                log::error!("[{}] session crashed: {reason}", self.ctx.session_id);
            }
        }
        self.publish_end(&ending);

        self.queue.close();
        let mut abandoned = 0usize;
        while let Ok(request) = self.queue.try_recv() {
            request.resolve_gone();
            abandoned += 1;
        }
        if abandoned > 0 {
            log::debug!(
                "[{}] resolved {abandoned} queued request(s) as session_gone",
                self.ctx.session_id
            );
        }

        if let Err(e) = self.transport.terminate().await {
            log::warn!("[{}] failed to reap debugger: {e}", self.ctx.session_id);
        }
    }

    /// Make the terminal state visible before any request learns of it
    fn publish_end(&self, ending: &Ending) {
        let state = match ending {
            Ending::Cancelled => SessionState::Terminated,
            Ending::Crashed(_) => SessionState::Crashed,
        };
        self.ctx.shared.mark_ended();
        self.set_state(state);
    }

    fn set_state(&self, state: SessionState) {
        self.ctx.state_tx.send_if_modified(|current| {
            // Terminal states are final
            if current.is_ended() || *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

fn trim_partial(buffer: &str) -> &str {
    buffer.trim_end_matches(['\n', '\r'])
}

fn with_marker(output: String, truncated: bool) -> String {
    if truncated {
        format!("{TRUNCATION_MARKER}{output}")
    } else {
        output
    }
}
