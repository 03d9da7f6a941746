//! Debugger session options and configuration
//!
//! This module contains the configuration shared by every session a registry
//! creates, a builder for it, and environment-variable loading for the server
//! binary.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DebuggerError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Prompt token GDB prints when ready for the next command
pub const DEFAULT_PROMPT: &str = "(gdb)";

/// Time allowed for the first prompt after spawn
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-command deadline when the caller gives none
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Live sessions allowed at once
pub const DEFAULT_MAX_SESSIONS: usize = 32;

/// How long ended sessions stay queryable
pub const DEFAULT_ENDED_RETENTION: Duration = Duration::from_secs(60);

/// Default maximum buffered output per command / idle period (1MB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// GDB pager prompt
pub const DEFAULT_PAGER_PATTERN: &str = r"--Type <RET> for more, q to quit, c to continue without paging--|---Type <return> to continue, or q <return> to quit---";

/// Arguments passed to GDB unless overridden
///
/// Keeps user init files out of the way (they may change the prompt) and
/// disables paging and confirmation questions that would otherwise stall a
/// non-interactive session.
pub const DEFAULT_DEBUGGER_ARGS: &[&str] = &[
    "--quiet",
    "--nx",
    "-ex",
    "set pagination off",
    "-ex",
    "set confirm off",
    "-ex",
    "set width 0",
];

/// Line-anchored patterns that classify a completed command as an error
pub const DEFAULT_ERROR_PATTERNS: &[&str] = &[
    r"^\^error",
    r"^No symbol ",
    r"^No symbol table is loaded",
    r"^No executable file",
    r"^No stack\.",
    r"^No registers\.",
    r"^The program is not being run\.",
    r"^Cannot access memory",
    r"^Undefined command",
    r"^A syntax error",
    r"^Function .* not defined",
    r"^ptrace: ",
    r": No such file or directory\.$",
];

/// Environment variable: debugger executable
pub const ENV_GDB_PATH: &str = "KODEGEN_GDB_PATH";
/// Environment variable: JSON array of debugger arguments
pub const ENV_GDB_ARGS: &str = "KODEGEN_GDB_ARGS";
/// Environment variable: default command timeout in seconds
pub const ENV_COMMAND_TIMEOUT: &str = "KODEGEN_GDB_COMMAND_TIMEOUT_SECS";
/// Environment variable: startup timeout in seconds
pub const ENV_STARTUP_TIMEOUT: &str = "KODEGEN_GDB_STARTUP_TIMEOUT_SECS";
/// Environment variable: idle timeout in seconds (unset or 0 disables)
pub const ENV_IDLE_TIMEOUT: &str = "KODEGEN_GDB_IDLE_TIMEOUT_SECS";
/// Environment variable: maximum live sessions
pub const ENV_MAX_SESSIONS: &str = "KODEGEN_GDB_MAX_SESSIONS";

// ============================================================================
// Debugger Options
// ============================================================================

/// Options applied to every session created by a registry
#[derive(Debug, Clone)]
pub struct DebuggerOptions {
    /// Debugger executable; `gdb` on `PATH` when None
    pub debugger_path: Option<PathBuf>,
    /// Arguments passed to the debugger at spawn
    pub debugger_args: Vec<String>,
    /// Default working directory; the server's cwd when None
    pub working_dir: Option<PathBuf>,
    /// Prompt token marking the end of a command's output
    pub prompt: String,
    /// Line-anchored regexes classifying output as an error
    pub error_patterns: Vec<String>,
    /// Pager prompt regex answered automatically with a newline
    pub pager_pattern: Option<String>,
    /// Deadline for the first prompt after spawn
    pub startup_timeout: Duration,
    /// Default per-command deadline
    pub command_timeout: Duration,
    /// Terminate sessions idle for longer than this
    pub idle_timeout: Option<Duration>,
    /// Maximum number of live sessions
    pub max_sessions: usize,
    /// Retention of terminated / crashed sessions
    pub ended_retention: Duration,
    /// Cap on buffered output text
    pub max_buffer_size: usize,
}

impl Default for DebuggerOptions {
    fn default() -> Self {
        Self {
            debugger_path: None,
            debugger_args: DEFAULT_DEBUGGER_ARGS.iter().map(|s| (*s).to_string()).collect(),
            working_dir: None,
            prompt: DEFAULT_PROMPT.to_string(),
            error_patterns: DEFAULT_ERROR_PATTERNS.iter().map(|s| (*s).to_string()).collect(),
            pager_pattern: Some(DEFAULT_PAGER_PATTERN.to_string()),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            idle_timeout: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
            ended_retention: DEFAULT_ENDED_RETENTION,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl DebuggerOptions {
    /// Create a new builder for `DebuggerOptions`
    #[must_use]
    pub fn builder() -> DebuggerOptionsBuilder {
        DebuggerOptionsBuilder::default()
    }

    /// Load options from `KODEGEN_GDB_*` environment variables over defaults
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a variable is present but malformed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary key lookup
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a value is present but malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(path) = lookup(ENV_GDB_PATH).filter(|p| !p.trim().is_empty()) {
            options.debugger_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_GDB_ARGS) {
            options.debugger_args = serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
                DebuggerError::invalid_config(format!(
                    "{ENV_GDB_ARGS} must be a JSON array of strings: {e}"
                ))
            })?;
        }

        if let Some(secs) = parse_secs(&lookup, ENV_COMMAND_TIMEOUT)? {
            if secs == 0 {
                return Err(DebuggerError::invalid_config(format!(
                    "{ENV_COMMAND_TIMEOUT} must be greater than zero"
                )));
            }
            options.command_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_secs(&lookup, ENV_STARTUP_TIMEOUT)? {
            options.startup_timeout = Duration::from_secs(secs.max(1));
        }

        if let Some(secs) = parse_secs(&lookup, ENV_IDLE_TIMEOUT)? {
            options.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(max) = parse_secs(&lookup, ENV_MAX_SESSIONS)? {
            if max == 0 {
                return Err(DebuggerError::invalid_config(format!(
                    "{ENV_MAX_SESSIONS} must be greater than zero"
                )));
            }
            options.max_sessions = max as usize;
        }

        Ok(options)
    }

    /// Resolve the debugger executable, searching `PATH` for `gdb` if unset
    ///
    /// # Errors
    /// Returns `Spawn` if no path is configured and `gdb` is not on `PATH`
    pub fn resolve_debugger_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.debugger_path {
            return Ok(path.clone());
        }
        which::which("gdb").map_err(|e| {
            DebuggerError::spawn(format!(
                "gdb not found on PATH ({e}); install gdb or set {ENV_GDB_PATH}"
            ))
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
            DebuggerError::invalid_config(format!("{key}={raw:?} is not a number: {e}"))
        }),
    }
}

// ============================================================================
// Builder for DebuggerOptions
// ============================================================================

/// Builder for `DebuggerOptions`
#[derive(Debug, Default)]
pub struct DebuggerOptionsBuilder {
    options: DebuggerOptions,
}

impl DebuggerOptionsBuilder {
    /// Set the debugger executable
    #[must_use]
    pub fn debugger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.debugger_path = Some(path.into());
        self
    }

    /// Replace the debugger arguments
    #[must_use]
    pub fn debugger_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.debugger_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default working directory
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.working_dir = Some(path.into());
        self
    }

    /// Set the prompt token
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.prompt = prompt.into();
        self
    }

    /// Replace the error patterns
    #[must_use]
    pub fn error_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.error_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set or clear the pager pattern
    #[must_use]
    pub fn pager_pattern(mut self, pattern: Option<String>) -> Self {
        self.options.pager_pattern = pattern;
        self
    }

    /// Set the startup timeout
    #[must_use]
    pub const fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.options.startup_timeout = timeout;
        self
    }

    /// Set the default command timeout
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Enable the idle timeout
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.options.idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of live sessions
    ///
    /// # Panics
    /// Panics if `max` is zero
    #[must_use]
    pub fn max_sessions(mut self, max: usize) -> Self {
        assert!(max > 0, "max_sessions must be greater than zero");
        self.options.max_sessions = max;
        self
    }

    /// Set how long ended sessions are retained
    #[must_use]
    pub const fn ended_retention(mut self, retention: Duration) -> Self {
        self.options.ended_retention = retention;
        self
    }

    /// Set the output buffer cap
    #[must_use]
    pub const fn max_buffer_size(mut self, size: usize) -> Self {
        self.options.max_buffer_size = size;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> DebuggerOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let options = DebuggerOptions::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(options.command_timeout, DEFAULT_COMMAND_TIMEOUT);
        assert_eq!(options.prompt, DEFAULT_PROMPT);
        assert!(options.idle_timeout.is_none());
        assert!(options.debugger_path.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let options = DebuggerOptions::from_lookup(lookup_from(&[
            (ENV_GDB_PATH, "/opt/gdb/bin/gdb"),
            (ENV_GDB_ARGS, r#"["--quiet", "-ex", "set pagination off"]"#),
            (ENV_COMMAND_TIMEOUT, "5"),
            (ENV_IDLE_TIMEOUT, "600"),
            (ENV_MAX_SESSIONS, "4"),
        ]))
        .unwrap();
        assert_eq!(
            options.debugger_path.as_deref(),
            Some(std::path::Path::new("/opt/gdb/bin/gdb"))
        );
        assert_eq!(options.debugger_args.len(), 3);
        assert_eq!(options.command_timeout, Duration::from_secs(5));
        assert_eq!(options.idle_timeout, Some(Duration::from_secs(600)));
        assert_eq!(options.max_sessions, 4);
    }

    #[test]
    fn zero_idle_timeout_disables() {
        let options =
            DebuggerOptions::from_lookup(lookup_from(&[(ENV_IDLE_TIMEOUT, "0")])).unwrap();
        assert!(options.idle_timeout.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(DebuggerOptions::from_lookup(lookup_from(&[(ENV_COMMAND_TIMEOUT, "soon")])).is_err());
        assert!(DebuggerOptions::from_lookup(lookup_from(&[(ENV_GDB_ARGS, "--quiet")])).is_err());
        assert!(DebuggerOptions::from_lookup(lookup_from(&[(ENV_MAX_SESSIONS, "0")])).is_err());
    }

    #[test]
    fn explicit_path_wins_over_search() {
        let options = DebuggerOptions::builder().debugger_path("/bin/sh").build();
        assert_eq!(
            options.resolve_debugger_path().unwrap(),
            PathBuf::from("/bin/sh")
        );
    }
}
