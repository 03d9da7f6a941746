//! Subprocess transport for debugger processes

use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{DebuggerError, Result};
use crate::transport::Transport;

use super::config::{EXIT_DRAIN_GRACE, SpawnConfig};

/// Subprocess transport owning one debugger process
pub struct SubprocessTransport {
    pub(super) program: PathBuf,
    pub(super) child: Child,
    pub(super) pid: Option<u32>,
    pub(super) stdin: Option<ChildStdin>,
    pub(super) chunks: mpsc::UnboundedReceiver<String>,
    pub(super) reader_task: Option<JoinHandle<()>>,
    pub(super) exited: bool,
    pub(super) exit_status: Option<ExitStatus>,
    pub(super) terminated: bool,
}

impl SubprocessTransport {
    /// Spawn the debugger described by `config`
    ///
    /// # Errors
    /// Returns `Spawn` if the executable cannot be started
    pub fn spawn(config: &SpawnConfig) -> Result<Self> {
        Self::spawn_impl(config)
    }

    /// Debugger executable this transport runs
    #[must_use]
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Exit status, once the process has been observed to exit
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }
}

impl Transport for SubprocessTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        if self.exited || self.terminated {
            return Err(DebuggerError::transport("debugger process has exited"));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DebuggerError::transport("stdin not available"))?;

        let mut data = String::with_capacity(line.len() + 1);
        data.push_str(line);
        data.push('\n');

        stdin
            .write_all(data.as_bytes())
            .await
            .map_err(|e| DebuggerError::transport(format!("Failed to write to stdin: {e}")))?;

        stdin
            .flush()
            .await
            .map_err(|e| DebuggerError::transport(format!("Failed to flush stdin: {e}")))?;

        Ok(())
    }

    async fn read_chunk(&mut self) -> Option<String> {
        if self.exited {
            return tokio::time::timeout(EXIT_DRAIN_GRACE, self.chunks.recv())
                .await
                .ok()
                .flatten();
        }

        tokio::select! {
            biased;
            chunk = self.chunks.recv() => {
                if chunk.is_none() {
                    // Output closed: treat as exit even if the pid lingers
                    self.exited = true;
                }
                chunk
            }
            status = self.child.wait() => {
                self.exited = true;
                self.exit_status = status.ok();
                log::debug!(
                    "{} (pid {:?}) exited: {:?}",
                    self.program.display(),
                    self.pid,
                    self.exit_status
                );
                tokio::time::timeout(EXIT_DRAIN_GRACE, self.chunks.recv())
                    .await
                    .ok()
                    .flatten()
            }
        }
    }

    fn try_read_chunk(&mut self) -> Option<String> {
        self.chunks.try_recv().ok()
    }

    fn is_alive(&mut self) -> bool {
        if self.exited || self.terminated {
            return false;
        }
        matches!(self.child.try_wait(), Ok(None))
    }

    fn pid(&self) -> Option<u32> {
        if self.terminated { None } else { self.pid }
    }

    async fn terminate(&mut self) -> Result<()> {
        self.terminate_impl().await
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        self.drop_impl();
    }
}
