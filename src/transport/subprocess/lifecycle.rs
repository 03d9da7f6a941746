//! Lifecycle management for subprocess transport (spawn, terminate, interrupt)

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::net::unix::pipe;
use tokio::sync::mpsc;

use crate::error::{DebuggerError, Result};

use super::command::CommandBuilder;
use super::config::{REAP_TIMEOUT, SpawnConfig};
use super::reader::spawn_output_reader;
use super::transport::SubprocessTransport;

impl SubprocessTransport {
    /// Spawn the debugger process and its output reader
    ///
    /// # Errors
    /// Returns `Spawn` if the pipe cannot be created or the process fails to start
    pub(super) fn spawn_impl(config: &SpawnConfig) -> Result<Self> {
        if !config.working_dir.is_dir() {
            return Err(DebuggerError::spawn(format!(
                "Working directory does not exist: {}",
                config.working_dir.display()
            )));
        }

        let (output_tx, output_rx) = pipe::pipe()
            .map_err(|e| DebuggerError::spawn(format!("Failed to create output pipe: {e}")))?;

        // The command (and with it our copies of the write end) is dropped at
        // the end of this block so the reader sees end-of-stream once the
        // process and its children are gone.
        let mut child = {
            let write_end = output_tx.into_blocking_fd()?;
            let write_dup = write_end.try_clone()?;
            let mut cmd = CommandBuilder::new(config).build(write_end, write_dup);
            cmd.spawn().map_err(|e| {
                DebuggerError::spawn(format!(
                    "Failed to start {}: {e}",
                    config.program.display()
                ))
            })?
        };

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DebuggerError::spawn("Failed to get stdin handle"))?;

        let pid = child.id();
        let label = format!(
            "{}:{}",
            config
                .program
                .file_name()
                .map_or_else(|| config.program.display().to_string(), |n| n.to_string_lossy().into_owned()),
            pid.unwrap_or_default()
        );

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let reader_task = spawn_output_reader(output_rx, chunk_tx, label);

        log::debug!(
            "Spawned {} {:?} in {} (pid {:?})",
            config.program.display(),
            config.args,
            config.working_dir.display(),
            pid
        );

        Ok(Self {
            program: config.program.clone(),
            child,
            pid,
            stdin: Some(stdin),
            chunks: chunk_rx,
            reader_task: Some(reader_task),
            exited: false,
            exit_status: None,
            terminated: false,
        })
    }

    /// Kill the process without waiting for a graceful exit, then reap it
    ///
    /// # Errors
    /// Returns error if waiting for the process fails
    pub(super) async fn terminate_impl(&mut self) -> Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;

        // Closing stdin first lets a well-behaved debugger see EOF
        drop(self.stdin.take());

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }

        if self.exit_status.is_none() {
            // Already-exited processes make start_kill fail; that is fine
            let _ = self.child.start_kill();
            match tokio::time::timeout(REAP_TIMEOUT, self.child.wait()).await {
                Ok(Ok(status)) => self.exit_status = Some(status),
                Ok(Err(e)) => return Err(DebuggerError::Io(e)),
                Err(_) => {
                    return Err(DebuggerError::timeout(format!(
                        "process {:?} was not reaped within {}s",
                        self.pid,
                        REAP_TIMEOUT.as_secs()
                    )));
                }
            }
        }
        self.exited = true;
        Ok(())
    }

    /// Handle Drop cleanup
    pub(super) fn drop_impl(&mut self) {
        drop(self.stdin.take());

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }

        if !self.terminated && self.exit_status.is_none() {
            let _ = self.child.start_kill();
        }
    }
}

/// Send SIGINT to a debugger process
///
/// Interrupting does not touch the pipes, so it is safe to do from outside
/// the session worker while a command is in flight.
///
/// # Errors
/// Returns `Transport` if the signal cannot be delivered
pub fn send_interrupt(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid)
        .map_err(|_| DebuggerError::transport(format!("invalid pid {pid}")))?;
    kill(Pid::from_raw(raw), Signal::SIGINT)
        .map_err(|e| DebuggerError::transport(format!("Failed to interrupt pid {pid}: {e}")))
}
