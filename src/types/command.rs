//! Command requests, results, and debugger command formatting
//!
//! The engine never interprets debugger syntax: a [`DebuggerCommand`] is only
//! a convenient way of producing the literal line that gets written to the
//! process, and a [`CommandResult`] carries the raw text that came back.

use serde::{Deserialize, Serialize};

// ============================================================================
// Command results
// ============================================================================

/// Outcome classification of a single command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Prompt reappeared and no error pattern matched
    Ok,
    /// Prompt reappeared but an error pattern matched the output
    Error,
    /// No boundary within the command's deadline
    Timeout,
    /// Process exited or the session was terminated
    SessionGone,
}

impl CommandStatus {
    /// Lowercase name used in envelopes and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::SessionGone => "session_gone",
        }
    }
}

/// Result of one command, written exactly once by the session worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Outcome classification
    pub status: CommandStatus,

    /// Text between the previous boundary and this command's boundary
    pub output: String,

    /// Text the process produced while idle, before this command was written
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unsolicited: String,

    /// Wall-clock time from submission to resolution
    pub duration_ms: u64,
}

impl CommandResult {
    /// Build a result with no unsolicited text
    pub fn new(status: CommandStatus, output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status,
            output: output.into(),
            unsolicited: String::new(),
            duration_ms,
        }
    }

    /// Result for a request that can never run because the session ended
    #[must_use]
    pub fn session_gone(output: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(CommandStatus::SessionGone, output, duration_ms)
    }

    /// Whether the command completed without an error pattern
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Ok
    }
}

// ============================================================================
// Command formatting
// ============================================================================

/// Typed builder for the GDB command lines the tool surface issues
///
/// Every variant renders to a single line; [`DebuggerCommand::Raw`] is the
/// escape hatch and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    /// `file <path>`
    File(String),
    /// `set args <arguments...>`
    SetArgs(Vec<String>),
    /// `attach <pid>`
    Attach(u32),
    /// `core <path>`
    Core(String),
    /// `continue`
    Continue,
    /// `step` / `stepi`
    Step {
        /// Step by machine instruction
        instructions: bool,
    },
    /// `next` / `nexti`
    Next {
        /// Step over by machine instruction
        instructions: bool,
    },
    /// `finish`
    Finish,
    /// `break <location> [if <condition>]`
    Break {
        /// Breakpoint location (function, file:line, *address)
        location: String,
        /// Optional condition expression
        condition: Option<String>,
    },
    /// `bt [full] [limit]`
    Backtrace {
        /// Include locals for each frame
        full: bool,
        /// Maximum number of frames
        limit: Option<u32>,
    },
    /// `print <expression>`
    Print(String),
    /// `x[/<count><format>] <address>`
    Examine {
        /// Address expression
        address: String,
        /// Number of units to show
        count: Option<u32>,
        /// Format / unit letters, e.g. `x`, `xg`, `s`, `i`
        format: Option<String>,
    },
    /// `info registers [register]`
    Registers(Option<String>),
    /// Verbatim command line
    Raw(String),
}

impl DebuggerCommand {
    /// Render the command line to write to the debugger
    #[must_use]
    pub fn to_command_line(&self) -> String {
        match self {
            Self::File(path) => format!("file {path}"),
            Self::SetArgs(args) => format!("set args {}", args.join(" ")),
            Self::Attach(pid) => format!("attach {pid}"),
            Self::Core(path) => format!("core {path}"),
            Self::Continue => "continue".to_string(),
            Self::Step { instructions: true } => "stepi".to_string(),
            Self::Step { instructions: false } => "step".to_string(),
            Self::Next { instructions: true } => "nexti".to_string(),
            Self::Next { instructions: false } => "next".to_string(),
            Self::Finish => "finish".to_string(),
            Self::Break {
                location,
                condition: Some(condition),
            } => format!("break {location} if {condition}"),
            Self::Break { location, .. } => format!("break {location}"),
            Self::Backtrace { full, limit } => {
                let mut cmd = String::from("bt");
                if *full {
                    cmd.push_str(" full");
                }
                if let Some(limit) = limit {
                    cmd.push_str(&format!(" {limit}"));
                }
                cmd
            }
            Self::Print(expression) => format!("print {expression}"),
            Self::Examine {
                address,
                count,
                format,
            } => {
                let suffix = match (count, format.as_deref()) {
                    (Some(count), Some(format)) => format!("/{count}{format}"),
                    (Some(count), None) => format!("/{count}"),
                    (None, Some(format)) => format!("/{format}"),
                    (None, None) => String::new(),
                };
                format!("x{suffix} {address}")
            }
            Self::Registers(Some(register)) => format!("info registers {register}"),
            Self::Registers(None) => "info registers".to_string(),
            Self::Raw(text) => text.clone(),
        }
    }
}

impl From<DebuggerCommand> for String {
    fn from(cmd: DebuggerCommand) -> Self {
        cmd.to_command_line()
    }
}
