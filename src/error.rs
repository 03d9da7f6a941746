//! Error types for the GDB session engine

use thiserror::Error;

/// Main error type for debugger session management
#[derive(Error, Debug)]
pub enum DebuggerError {
    /// Debugger executable missing, unrunnable, or never reached its first prompt
    #[error("Failed to start debugger: {0}")]
    Spawn(String),

    /// Unknown session identifier
    #[error("session not found: {0}")]
    NotFound(String),

    /// Session process exited or was terminated
    #[error("session {session_id} is gone: {reason}")]
    SessionGone {
        /// Session that ended
        session_id: String,
        /// Why the session is no longer usable
        reason: String,
    },

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipe-level failure talking to the debugger process
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A prompt, error, or pager pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Maximum live sessions limit reached
    #[error("Maximum active sessions reached: {0}")]
    MaxSessionsReached(usize),
}

/// Result type alias for debugger operations
pub type Result<T> = std::result::Result<T, DebuggerError>;

impl DebuggerError {
    /// Create a spawn error
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create a session not found error
    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::NotFound(session_id.into())
    }

    /// Create a session gone error
    pub fn session_gone(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SessionGone {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a max sessions error
    #[must_use]
    pub fn max_sessions_reached(max: usize) -> Self {
        Self::MaxSessionsReached(max)
    }

    /// Whether this error means the session can no longer be used
    #[must_use]
    pub fn is_session_gone(&self) -> bool {
        matches!(self, Self::SessionGone { .. })
    }

    /// Message used in the tool envelope's `error` field
    ///
    /// Unknown ids map to the fixed text `"session not found"` so every
    /// tool reports them identically.
    #[must_use]
    pub fn envelope_message(&self) -> String {
        match self {
            Self::NotFound(_) => "session not found".to_string(),
            other => other.to_string(),
        }
    }
}
