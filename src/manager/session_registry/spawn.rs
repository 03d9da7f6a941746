//! Session creation logic
//!
//! Resolves per-call overrides against the registry's options, spawns the
//! debugger, and registers the ready session.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use crate::error::{DebuggerError, Result};
use crate::transport::SpawnConfig;
use crate::types::identifiers::SessionId;

use super::super::session::DebuggerSession;
use super::core::{RegistryInner, SessionRegistry};

// ============================================================================
// REQUEST TYPES
// ============================================================================

/// Request parameters for starting a new debugger session
#[derive(Debug, Clone, Default)]
pub struct StartSessionRequest {
    /// Debugger executable; the registry default when None
    pub debugger_path: Option<PathBuf>,
    /// Debugger arguments; the registry default when None
    pub args: Option<Vec<String>>,
    /// Working directory; the registry default, then the current directory
    pub working_dir: Option<PathBuf>,
}

// ============================================================================
// SPAWN IMPLEMENTATION
// ============================================================================

impl SessionRegistry {
    /// Start a new debugger session
    ///
    /// Spawns the process, waits for its first prompt, and registers the
    /// session. A session that fails to start never enters the registry.
    ///
    /// Returns the session ID for subsequent operations.
    ///
    /// # Errors
    /// Returns `MaxSessionsReached` when the live limit is hit, `Spawn` if
    /// the debugger cannot be started or never becomes ready.
    pub async fn create(&self, request: StartSessionRequest) -> Result<SessionId> {
        let options = &self.inner.options;
        let max = options.max_sessions;

        if self.inner.live.read().len() >= max {
            return Err(DebuggerError::max_sessions_reached(max));
        }

        let program = match request.debugger_path {
            Some(path) => path,
            None => options.resolve_debugger_path()?,
        };
        let working_dir = match request.working_dir.or_else(|| options.working_dir.clone()) {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let args = request
            .args
            .unwrap_or_else(|| options.debugger_args.clone());

        let session_id = SessionId::generate();
        let config = SpawnConfig::new(program, args, working_dir);
        let session = Arc::new(DebuggerSession::start(session_id.clone(), options, config).await?);

        // Re-check under the write lock: concurrent creates may have raced us
        let rejected = {
            let mut live = self.inner.live.write();
            if live.len() >= max {
                true
            } else {
                live.insert(session_id.clone(), Arc::clone(&session));
                false
            }
        };
        if rejected {
            session.terminate().await;
            return Err(DebuggerError::max_sessions_reached(max));
        }

        spawn_crash_monitor(Arc::downgrade(&self.inner), &session);

        Ok(session_id)
    }
}

/// Retire the session from the live map as soon as it ends on its own
fn spawn_crash_monitor(registry: Weak<RegistryInner>, session: &DebuggerSession) {
    let mut state_rx = session.subscribe_state();
    let session_id = session.id().clone();

    tokio::spawn(async move {
        let closed = state_rx.wait_for(|state| state.is_ended()).await.is_err();
        if closed {
            log::debug!("[{session_id}] state channel closed");
        }
        if let Some(registry) = registry.upgrade() {
            registry.retire(&session_id);
        }
    });
}
