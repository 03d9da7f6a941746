//! Transport layer for communicating with a debugger process
//!
//! This module provides the transport abstraction the session worker drives
//! and the subprocess implementation that spawns the debugger with piped
//! stdio.

pub mod subprocess;

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Upper bound applied to [`Transport::read_until`] timeouts
const MAX_READ_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Outcome of [`Transport::read_until`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The predicate accepted the buffer
    Matched,
    /// The deadline passed first
    TimedOut,
    /// The output stream ended first
    Closed,
}

/// Process handle contract used by a session worker
///
/// A transport exclusively owns one OS process and its pipes. Only the
/// session's worker task ever holds it, so no method needs interior locking.
pub trait Transport: Send {
    /// Write one line (a trailing newline is appended)
    ///
    /// # Errors
    /// Returns error if the input pipe is closed or the write fails
    fn write_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output text
    ///
    /// Returns `None` once the stream has ended. Cancel-safe: dropping the
    /// future loses no output.
    fn read_chunk(&mut self) -> impl Future<Output = Option<String>> + Send;

    /// Take output that has already arrived, without waiting
    fn try_read_chunk(&mut self) -> Option<String>;

    /// Whether the process is still running
    fn is_alive(&mut self) -> bool;

    /// OS process id, while known
    fn pid(&self) -> Option<u32>;

    /// Stop the process and reclaim its resources (idempotent)
    ///
    /// # Errors
    /// Returns error if the process could not be reaped
    fn terminate(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Append output to `buffer` until `predicate` accepts it, the stream
    /// ends, or `timeout` elapses
    ///
    /// The predicate is checked once before reading so text already in the
    /// buffer can satisfy it.
    fn read_until<P>(
        &mut self,
        buffer: &mut String,
        mut predicate: P,
        timeout: Duration,
    ) -> impl Future<Output = ReadOutcome> + Send
    where
        P: FnMut(&str) -> bool + Send,
    {
        async move {
            if predicate(buffer) {
                return ReadOutcome::Matched;
            }
            let deadline = tokio::time::Instant::now() + timeout.min(MAX_READ_TIMEOUT);
            loop {
                match tokio::time::timeout_at(deadline, self.read_chunk()).await {
                    Ok(Some(chunk)) => {
                        buffer.push_str(&chunk);
                        if predicate(buffer) {
                            return ReadOutcome::Matched;
                        }
                    }
                    Ok(None) => return ReadOutcome::Closed,
                    Err(_) => return ReadOutcome::TimedOut,
                }
            }
        }
    }
}

pub use subprocess::{SpawnConfig, SubprocessTransport};
