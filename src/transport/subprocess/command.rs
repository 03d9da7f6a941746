//! Process command building logic for subprocess transport

use std::os::fd::OwnedFd;
use std::process::Stdio;
use tokio::process::Command;

use super::config::SpawnConfig;

/// Command builder for the debugger process
pub struct CommandBuilder<'a> {
    config: &'a SpawnConfig,
}

impl<'a> CommandBuilder<'a> {
    /// Create a new command builder
    pub fn new(config: &'a SpawnConfig) -> Self {
        Self { config }
    }

    /// Build the command with stdin piped and both output streams sent to
    /// `output` so stderr text stays ordered relative to the prompt
    pub fn build(&self, output: OwnedFd, output_dup: OwnedFd) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .current_dir(&self.config.working_dir)
            .env("PWD", &self.config.working_dir)
            // Line-oriented output without terminal escape sequences
            .env("TERM", "dumb")
            .env_remove("COLUMNS")
            .env_remove("LINES")
            .stdin(Stdio::piped())
            .stdout(output)
            .stderr(output_dup)
            .kill_on_drop(true);
        cmd
    }
}
