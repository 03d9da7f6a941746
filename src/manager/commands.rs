//! Command request protocol between a session and its worker
//!
//! A request travels over the session's unbounded queue; its result slot is
//! a oneshot channel that the worker writes exactly once.

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::types::command::{CommandResult, CommandStatus};

use super::helpers::millis;

/// Longest timeout a request can carry; larger values are clamped
pub(super) const MAX_COMMAND_TIMEOUT: std::time::Duration =
    std::time::Duration::from_secs(365 * 24 * 60 * 60);

/// One queued command
pub(super) struct CommandRequest {
    /// Literal line written to the debugger
    pub command: String,

    /// When the caller submitted the request
    pub submitted_at: Instant,

    /// Submission time plus the request's timeout
    pub deadline: Instant,

    /// Single-assignment result slot
    pub result_tx: oneshot::Sender<CommandResult>,
}

impl CommandRequest {
    /// Create a request and the receiver its caller awaits
    ///
    /// `timeout` is clamped to [`MAX_COMMAND_TIMEOUT`].
    pub fn new(
        command: String,
        timeout: std::time::Duration,
    ) -> (Self, oneshot::Receiver<CommandResult>) {
        let (result_tx, result_rx) = oneshot::channel();
        let submitted_at = Instant::now();
        let request = Self {
            command,
            submitted_at,
            deadline: submitted_at + timeout.min(MAX_COMMAND_TIMEOUT),
            result_tx,
        };
        (request, result_rx)
    }

    /// Milliseconds since submission
    pub fn elapsed_ms(&self) -> u64 {
        millis(self.submitted_at.elapsed())
    }

    /// Write the result slot, consuming the request
    ///
    /// A caller that stopped waiting has dropped its receiver; that is not
    /// an error for the worker.
    pub fn resolve(self, status: CommandStatus, output: String, unsolicited: String) {
        let mut result = CommandResult::new(status, output, self.elapsed_ms());
        result.unsolicited = unsolicited;
        let _ = self.result_tx.send(result);
    }

    /// Resolve as `SessionGone` with no output
    pub fn resolve_gone(self) {
        let result = CommandResult::session_gone("", self.elapsed_ms());
        let _ = self.result_tx.send(result);
    }
}
