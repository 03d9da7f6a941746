//! Configuration constants and types for subprocess transport

use std::path::PathBuf;
use std::time::Duration;

/// How long to keep collecting output after the process has exited
///
/// A child of the debugger (e.g. the inferior) may still hold the pipe open,
/// so end-of-stream cannot be relied on.
pub const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(100);

/// How long to wait for a killed process to be reaped
pub const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to spawn one debugger process
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Debugger executable
    pub program: PathBuf,
    /// Arguments passed to the debugger
    pub args: Vec<String>,
    /// Working directory of the process
    pub working_dir: PathBuf,
}

impl SpawnConfig {
    /// Create a spawn configuration
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
        }
    }
}
