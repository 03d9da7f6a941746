//! MCP tools for driving debugger sessions
//!
//! Provides the `gdb_*` tool surface: one server type whose tool methods
//! resolve a session through the registry and wrap every outcome in a
//! [`ToolEnvelope`](crate::types::envelope::ToolEnvelope).

mod dispatch;
mod requests;
mod server;

pub use server::GdbServer;
