//! # GDB sessions as MCP tools
//!
//! Drives many interactive GDB processes at once and exposes them as
//! discrete, addressable operations. Each session owns one debugger process
//! and one worker task that serializes commands, frames the prompt-delimited
//! output, and reports a structured result per command.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kodegen_gdb::{DebuggerOptions, SessionRegistry, StartSessionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SessionRegistry::new(DebuggerOptions::from_env()?);
//!     let session_id = registry.create(StartSessionRequest::default()).await?;
//!
//!     let result = registry.submit(&session_id, "file /bin/true", None).await?;
//!     println!("{:?}: {}", result.status, result.output);
//!
//!     registry.terminate(&session_id).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Command Results
//!
//! Command outcomes are values, not errors. A [`CommandResult`] carries a
//! [`CommandStatus`] (`Ok`, `Error`, `Timeout`, `SessionGone`), the raw text
//! between the previous prompt and this command's prompt, and any output the
//! debugger produced while idle (`unsolicited`). A timed-out command leaves
//! its session usable: late output is discarded up to the next prompt so the
//! following command is framed correctly.
//!
//! ## Architecture
//!
//! - [`transport`]: Process handle (spawn, write, cancel-safe reads, reap)
//! - [`output`]: Boundary matcher and incremental UTF-8 decoding
//! - [`manager`]: Per-session command worker, `DebuggerSession`, and `SessionRegistry`
//! - [`tools`]: The `gdb_*` MCP tool surface served over stdio
//! - [`types`]: Identifiers, options, results, and the tool envelope
//! - [`error`]: Error types and handling
//!
//! ## Configuration
//!
//! [`DebuggerOptions::from_env`] reads `KODEGEN_GDB_PATH`, `KODEGEN_GDB_ARGS`,
//! `KODEGEN_GDB_COMMAND_TIMEOUT_SECS`, `KODEGEN_GDB_STARTUP_TIMEOUT_SECS`,
//! `KODEGEN_GDB_IDLE_TIMEOUT_SECS`, and `KODEGEN_GDB_MAX_SESSIONS`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod manager;
pub mod output;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use error::{DebuggerError, Result};
pub use manager::{DebuggerSession, SessionRegistry, StartSessionRequest};
pub use tools::GdbServer;
pub use transport::{SpawnConfig, SubprocessTransport, Transport};

pub use types::command::{CommandResult, CommandStatus, DebuggerCommand};
pub use types::envelope::{EnvelopeStatus, ToolEnvelope};
pub use types::identifiers::SessionId;
pub use types::options::{DebuggerOptions, DebuggerOptionsBuilder};
pub use types::session::{SessionState, SessionSummary, TerminateResponse};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// EMBEDDED SERVER FUNCTION
// ============================================================================

use rmcp::ServiceExt;
use std::sync::Arc;

/// Serve the `gdb_*` tools over stdio until the client disconnects or
/// Ctrl-C is received, then terminate every session
///
/// # Errors
/// Returns error if the MCP transport fails to start or ends abnormally
pub async fn serve_stdio(options: DebuggerOptions) -> anyhow::Result<()> {
    let registry = Arc::new(SessionRegistry::new(options));
    let server = GdbServer::new(Arc::clone(&registry));

    log::info!("kodegen-gdb {VERSION} listening on stdio");
    let running = server.serve(rmcp::transport::stdio()).await?;

    let outcome = tokio::select! {
        quit = running.waiting() => quit.map(|reason| {
            log::info!("MCP transport closed: {reason:?}");
        }).map_err(anyhow::Error::from),
        signal = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-C received");
            signal.map_err(anyhow::Error::from)
        }
    };

    registry.shutdown().await;
    outcome
}
