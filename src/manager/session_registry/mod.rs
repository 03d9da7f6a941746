//! Session registry implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Core struct, constructors, sweeper, and shutdown
//! - `spawn`: Session creation
//! - `list`: Session listing
//! - `interaction`: Lookup, command submission, interrupt, and termination

mod core;
mod interaction;
mod list;
mod spawn;

pub use self::core::SessionRegistry;
pub use spawn::StartSessionRequest;
