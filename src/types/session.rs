//! Session state and reporting types
//!
//! Types describing a debugger session's lifecycle as seen from outside the
//! worker: its state machine and the summaries returned by the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::identifiers::SessionId;

/// Lifecycle state of a debugger session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Idle, ready to accept a command
    Ready,
    /// A command is in flight
    Busy,
    /// Explicitly terminated
    Terminated,
    /// The debugger process exited on its own or a pipe failed
    Crashed,
}

impl SessionState {
    /// Terminal states hold no process and accept no commands
    #[must_use]
    pub const fn is_ended(self) -> bool {
        matches!(self, Self::Terminated | Self::Crashed)
    }

    /// Lowercase name used in logs and envelopes
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Terminated => "terminated",
            Self::Crashed => "crashed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session entry returned by `list sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique identifier for the session
    pub session_id: SessionId,

    /// Current lifecycle state
    pub state: SessionState,

    /// Loaded target executable, once `load target` succeeded
    pub executable_path: Option<PathBuf>,

    /// Debugger binary driving this session
    pub debugger_path: PathBuf,

    /// Working directory of the debugger process
    pub working_directory: PathBuf,

    /// OS process id of the debugger (None once ended)
    pub pid: Option<u32>,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Number of commands resolved so far
    pub commands_executed: u64,

    /// When the session ended (None while live)
    pub ended_at: Option<DateTime<Utc>>,
}

/// Response from `terminate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminateResponse {
    /// Session that was terminated
    pub session_id: SessionId,

    /// State after termination (`terminated`, or `crashed` if it had already died)
    pub final_state: SessionState,

    /// True when the session had already ended before this call
    pub already_ended: bool,

    /// Number of commands resolved over the session's lifetime
    pub commands_executed: u64,

    /// Session runtime in milliseconds
    pub runtime_ms: u64,
}
