//! Debugger session management
//!
//! Provides `SessionRegistry` for creating, dispatching to, and tearing down
//! concurrent debugger sessions, each driven by its own command worker.
//!
//! # Module Structure
//!
//! - `session_registry` - Core `SessionRegistry` with public API
//! - `session` - `DebuggerSession` and ended-session snapshots
//! - `commands` - Command requests passed to the worker
//! - `background` - The per-session command worker task
//! - `helpers` - Pure helper functions for output buffering

mod background;
mod commands;
mod helpers;
mod session;
mod session_registry;

pub use session::DebuggerSession;
pub use session_registry::{SessionRegistry, StartSessionRequest};
