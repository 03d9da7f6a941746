//! Session interaction methods
//!
//! Handles lookups, command submission, interrupts, and termination.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{DebuggerError, Result};
use crate::types::command::CommandResult;
use crate::types::identifiers::SessionId;
use crate::types::session::TerminateResponse;

use super::super::session::DebuggerSession;
use super::core::SessionRegistry;

impl SessionRegistry {
    /// Resolve a live session
    ///
    /// Never blocks on the session itself.
    ///
    /// # Errors
    /// Returns `SessionGone` for a session that ended within the retention
    /// period, `NotFound` for any other unknown id.
    pub fn get(&self, session_id: &SessionId) -> Result<Arc<DebuggerSession>> {
        let live = self.inner.live.read().get(session_id).cloned();
        if let Some(session) = live {
            let state = session.state();
            if state.is_ended() {
                return Err(DebuggerError::session_gone(session_id.as_str(), state.as_str()));
            }
            return Ok(session);
        }

        let retention = self.inner.options.ended_retention;
        let ended = self
            .inner
            .ended
            .read()
            .get(session_id)
            .filter(|ended| !ended.is_expired(retention))
            .map(|ended| ended.summary.state);

        match ended {
            Some(state) => Err(DebuggerError::session_gone(session_id.as_str(), state.as_str())),
            None => Err(DebuggerError::not_found(session_id.as_str())),
        }
    }

    /// Submit a command to a session and wait for its result
    ///
    /// `timeout` defaults to the registry's command timeout.
    ///
    /// # Errors
    /// Returns `NotFound`/`SessionGone` if the id does not name a live
    /// session. Command outcomes (including timeouts) are values.
    pub async fn submit(
        &self,
        session_id: &SessionId,
        command: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<CommandResult> {
        let session = self.get(session_id)?;
        Ok(session.submit(command, timeout).await)
    }

    /// Interrupt the command running in a session (SIGINT)
    ///
    /// # Errors
    /// Returns `NotFound`/`SessionGone` for unknown or ended sessions,
    /// `Transport` if the signal cannot be sent.
    pub fn interrupt(&self, session_id: &SessionId) -> Result<()> {
        self.get(session_id)?.interrupt()
    }

    /// Terminate a debugger session
    ///
    /// Cancels queued commands with `SessionGone`, kills and reaps the
    /// process, and moves the session to the ended table. Terminating a
    /// session that already ended (but is still retained) succeeds with
    /// `already_ended` set.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown or expired id.
    pub async fn terminate(&self, session_id: &SessionId) -> Result<TerminateResponse> {
        let live = self.inner.live.read().get(session_id).cloned();

        if let Some(session) = live {
            let already_ended = session.state().is_ended();
            session.terminate().await;
            let ended = self.inner.retire_session(&session);
            log::info!("[{session_id}] terminated after {} ms", ended.runtime_ms);

            return Ok(TerminateResponse {
                session_id: session_id.clone(),
                final_state: ended.summary.state,
                already_ended,
                commands_executed: ended.summary.commands_executed,
                runtime_ms: ended.runtime_ms,
            });
        }

        let retention = self.inner.options.ended_retention;
        let ended = self
            .inner
            .ended
            .read()
            .get(session_id)
            .filter(|ended| !ended.is_expired(retention))
            .cloned();

        ended
            .map(|ended| TerminateResponse {
                session_id: session_id.clone(),
                final_state: ended.summary.state,
                already_ended: true,
                commands_executed: ended.summary.commands_executed,
                runtime_ms: ended.runtime_ms,
            })
            .ok_or_else(|| DebuggerError::not_found(session_id.as_str()))
    }
}
