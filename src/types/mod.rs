//! Type definitions shared across the crate
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`)
//! - [`session`] - Session lifecycle states and summaries
//! - [`command`] - Command results and debugger command formatting
//! - [`envelope`] - The `{status, output?, error?}` tool envelope
//! - [`options`] - Configuration shared by every session

pub mod command;
pub mod envelope;
pub mod identifiers;
pub mod options;
pub mod session;

// Re-export commonly used types
pub use command::{CommandResult, CommandStatus, DebuggerCommand};
pub use envelope::{EnvelopeStatus, ToolEnvelope};
pub use identifiers::SessionId;
pub use options::DebuggerOptions;
pub use session::{SessionState, SessionSummary, TerminateResponse};
