//! Structured envelope returned by every tool
//!
//! `{status: "ok"|"error", output?, error?}` plus a few optional fields used
//! by specific operations (session id on start, session list, per-step
//! results for composite commands).

use serde::{Deserialize, Serialize};

use super::command::{CommandResult, CommandStatus};
use super::identifiers::SessionId;
use super::session::{SessionSummary, TerminateResponse};
use crate::error::DebuggerError;

/// Envelope status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    /// Operation succeeded
    Ok,
    /// Operation failed; see `error`
    Error,
}

/// Tool response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEnvelope {
    /// `ok` or `error`
    pub status: EnvelopeStatus,

    /// Raw debugger output, when a command ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Session the operation targeted or created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Command line(s) written to the debugger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Finer-grained outcome (`ok`, `error`, `timeout`, `session_gone`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandStatus>,

    /// Output the debugger produced while idle, before this command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsolicited: Option<String>,

    /// Sessions, for `list sessions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionSummary>>,

    /// Termination details, for `terminate session`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<TerminateResponse>,

    /// Individual command results of a composite operation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<ToolEnvelope>,
}

impl ToolEnvelope {
    /// Successful envelope with no payload
    #[must_use]
    pub fn ok() -> Self {
        Self::with_status(EnvelopeStatus::Ok)
    }

    /// Failed envelope with an error message
    pub fn error(message: impl Into<String>) -> Self {
        let mut envelope = Self::with_status(EnvelopeStatus::Error);
        envelope.error = Some(message.into());
        envelope
    }

    fn with_status(status: EnvelopeStatus) -> Self {
        Self {
            status,
            output: None,
            error: None,
            session_id: None,
            command: None,
            result: None,
            unsolicited: None,
            sessions: None,
            terminated: None,
            steps: Vec::new(),
        }
    }

    /// Envelope for a single command result
    ///
    /// Only `CommandStatus::Ok` maps to `status: "ok"`; every other outcome
    /// carries the output (possibly partial) and an explanatory `error`.
    #[must_use]
    pub fn from_command(command: &str, result: CommandResult) -> Self {
        let mut envelope = match result.status {
            CommandStatus::Ok => Self::ok(),
            CommandStatus::Error => Self::error("command reported an error"),
            CommandStatus::Timeout => Self::error(format!(
                "command timed out after {} ms",
                result.duration_ms
            )),
            CommandStatus::SessionGone => Self::error("debugger session is gone"),
        };
        envelope.command = Some(command.to_string());
        envelope.result = Some(result.status);
        envelope.output = Some(result.output);
        if !result.unsolicited.is_empty() {
            envelope.unsolicited = Some(result.unsolicited);
        }
        envelope
    }

    /// Envelope for a composite operation made of several commands
    ///
    /// Ok only if every step is ok; `output` concatenates step outputs.
    #[must_use]
    pub fn from_steps(steps: Vec<ToolEnvelope>) -> Self {
        let failed = steps.iter().find(|s| !s.is_ok());
        let mut envelope = match failed {
            Some(step) => Self::error(
                step.error
                    .clone()
                    .unwrap_or_else(|| "command failed".to_string()),
            ),
            None => Self::ok(),
        };
        let outputs: Vec<&str> = steps
            .iter()
            .filter_map(|s| s.output.as_deref())
            .filter(|o| !o.is_empty())
            .collect();
        envelope.output = Some(outputs.join("\n"));
        let commands: Vec<&str> = steps.iter().filter_map(|s| s.command.as_deref()).collect();
        envelope.command = Some(commands.join("; "));
        envelope.steps = steps;
        envelope
    }

    /// Set the session id
    #[must_use]
    pub fn session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Whether the envelope reports success
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == EnvelopeStatus::Ok
    }

    /// Serialize to pretty JSON, falling back to a minimal error body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!("{{\"status\":\"error\",\"error\":\"failed to encode response: {e}\"}}")
        })
    }
}

impl From<DebuggerError> for ToolEnvelope {
    fn from(err: DebuggerError) -> Self {
        Self::error(err.envelope_message())
    }
}
