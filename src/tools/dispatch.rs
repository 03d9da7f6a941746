//! Dispatch helpers shared by the tool handlers
//!
//! Every handler resolves the session id through the registry first, so
//! unknown ids produce the same envelope for every tool.

use rmcp::model::{CallToolResult, Content};
use std::time::Duration;

use crate::error::DebuggerError;
use crate::types::command::DebuggerCommand;
use crate::types::envelope::ToolEnvelope;
use crate::types::identifiers::SessionId;

use super::server::GdbServer;

/// Per-call timeout; zero or absent means the registry default
pub(super) fn timeout_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(Duration::from_secs)
}

/// Wrap an envelope as a tool result, flagging failures with `is_error`
pub(super) fn envelope_result(envelope: &ToolEnvelope) -> CallToolResult {
    let content = vec![Content::text(envelope.to_json())];
    if envelope.is_ok() {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    }
}

impl GdbServer {
    /// Run one command against a session
    pub(super) async fn run_command(
        &self,
        session_id: &str,
        command: DebuggerCommand,
        timeout_secs: Option<u64>,
    ) -> ToolEnvelope {
        let session_id = SessionId::from(session_id);
        let line = command.to_command_line();
        match self.registry.submit(&session_id, line.as_str(), timeout_from_secs(timeout_secs)).await {
            Ok(result) => ToolEnvelope::from_command(&line, result).session(session_id),
            Err(e) => failure(session_id, e),
        }
    }

    /// Run commands in order, stopping at the first one that is not ok
    ///
    /// Returns the per-step envelopes; the caller folds them into one.
    pub(super) async fn run_steps(
        &self,
        session_id: &str,
        commands: Vec<DebuggerCommand>,
        timeout_secs: Option<u64>,
    ) -> Result<Vec<ToolEnvelope>, ToolEnvelope> {
        let session_id = SessionId::from(session_id);
        let session = self
            .registry
            .get(&session_id)
            .map_err(|e| failure(session_id.clone(), e))?;
        let timeout = timeout_from_secs(timeout_secs);

        let mut steps = Vec::with_capacity(commands.len());
        for command in commands {
            let line = command.to_command_line();
            let result = session.submit(line.as_str(), timeout).await;
            let ok = result.is_ok();
            steps.push(ToolEnvelope::from_command(&line, result));
            if !ok {
                break;
            }
        }
        Ok(steps)
    }
}

/// Envelope for a failed lookup or lifecycle operation
pub(super) fn failure(session_id: SessionId, error: DebuggerError) -> ToolEnvelope {
    let known = !matches!(error, DebuggerError::NotFound(_));
    let envelope = ToolEnvelope::from(error);
    if known { envelope.session(session_id) } else { envelope }
}
