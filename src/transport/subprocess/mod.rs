//! Subprocess transport implementation for GDB-style debuggers
//!
//! This module provides a transport implementation that spawns the debugger
//! as a subprocess and communicates with it via stdin and a single merged
//! stdout/stderr pipe.

mod command;
mod config;
mod lifecycle;
mod reader;
mod transport;

// Re-export public types
pub use config::SpawnConfig;
pub use lifecycle::send_interrupt;
pub use transport::SubprocessTransport;
