//! Core session registry structure and lifecycle management
//!
//! Provides the `SessionRegistry` struct with initialization, retirement of
//! ended sessions, the background sweeper, and shutdown.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::types::identifiers::SessionId;
use crate::types::options::DebuggerOptions;
use crate::types::session::SessionState;

use super::super::session::{DebuggerSession, EndedSession};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Upper bound on the sweeper period
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Lower bound on the sweeper period
const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// REGISTRY CORE
// ============================================================================

/// State shared by the registry handle, its sweeper, and session monitors
pub(super) struct RegistryInner {
    pub options: DebuggerOptions,
    pub live: RwLock<HashMap<SessionId, Arc<DebuggerSession>>>,
    pub ended: RwLock<HashMap<SessionId, EndedSession>>,
}

impl RegistryInner {
    /// Move a session from the live map into the ended table
    ///
    /// Always records a fresh snapshot so the final state wins over any
    /// earlier capture.
    pub fn retire_session(&self, session: &DebuggerSession) -> EndedSession {
        self.live.write().remove(session.id());
        let ended = EndedSession::capture(session);
        self.ended
            .write()
            .insert(session.id().clone(), ended.clone());
        ended
    }

    /// Retire by id if the session is still in the live map
    pub fn retire(&self, id: &SessionId) {
        let session = self.live.write().remove(id);
        if let Some(session) = session {
            let ended = EndedSession::capture(&session);
            log::info!(
                "[{id}] retired ({}, {} commands)",
                ended.summary.state,
                ended.summary.commands_executed
            );
            self.ended.write().insert(id.clone(), ended);
        }
    }

    /// Drop expired tombstones and close idle sessions
    async fn sweep(&self) {
        let retention = self.options.ended_retention;
        self.ended
            .write()
            .retain(|_id, ended| !ended.is_expired(retention));

        let Some(idle_timeout) = self.options.idle_timeout else {
            return;
        };

        let idle: Vec<Arc<DebuggerSession>> = self
            .live
            .read()
            .values()
            .filter(|s| s.state() == SessionState::Ready && s.idle_for() >= idle_timeout)
            .cloned()
            .collect();

        for session in idle {
            log::info!(
                "[{}] idle for {}s; terminating",
                session.id(),
                session.idle_for().as_secs()
            );
            session.terminate().await;
            self.retire_session(&session);
        }
    }
}

/// Registry of concurrent debugger sessions
///
/// The `SessionRegistry` is the single owner of the session map. It handles:
/// - Session creation (spawn, startup handshake, max-sessions limit)
/// - Dispatch of commands by session id
/// - Termination, crash detection, and retention of ended sessions
/// - Optional idle-timeout enforcement
pub struct SessionRegistry {
    pub(super) inner: Arc<RegistryInner>,
    cleanup_handle: Option<tokio::task::JoinHandle<()>>,
}

impl SessionRegistry {
    /// Create an empty registry with its background sweeper
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(options: DebuggerOptions) -> Self {
        let period = sweep_period(&options);
        let inner = Arc::new(RegistryInner {
            options,
            live: RwLock::new(HashMap::new()),
            ended: RwLock::new(HashMap::new()),
        });

        let weak: Weak<RegistryInner> = Arc::downgrade(&inner);
        let cleanup_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.sweep().await;
            }
        });

        Self {
            inner,
            cleanup_handle: Some(cleanup_handle),
        }
    }

    /// Options applied to sessions this registry creates
    #[must_use]
    pub fn options(&self) -> &DebuggerOptions {
        &self.inner.options
    }

    /// Number of live sessions
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.live.read().len()
    }

    /// Terminate every live session
    ///
    /// Should be called before dropping to ensure every debugger is reaped.
    pub async fn shutdown(&self) {
        log::info!("Shutting down SessionRegistry...");

        let sessions: Vec<Arc<DebuggerSession>> =
            self.inner.live.read().values().cloned().collect();

        let count = sessions.len();
        futures::future::join_all(sessions.iter().map(|session| async move {
            log::debug!("Terminating session: {}", session.id());
            session.terminate().await;
            self.inner.retire_session(session);
        }))
        .await;

        log::info!("SessionRegistry shutdown complete ({count} session(s) terminated)");
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}

fn sweep_period(options: &DebuggerOptions) -> Duration {
    let base = options
        .idle_timeout
        .map_or(options.ended_retention, |idle| idle.min(options.ended_retention));
    (base / 2).clamp(MIN_CLEANUP_INTERVAL, CLEANUP_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_period_follows_shortest_deadline() {
        let options = DebuggerOptions::builder()
            .ended_retention(Duration::from_secs(60))
            .idle_timeout(Duration::from_secs(10))
            .build();
        assert_eq!(sweep_period(&options), Duration::from_secs(5));
    }

    #[test]
    fn sweep_period_is_clamped() {
        let short = DebuggerOptions::builder()
            .ended_retention(Duration::from_millis(10))
            .build();
        assert_eq!(sweep_period(&short), MIN_CLEANUP_INTERVAL);

        let long = DebuggerOptions::builder()
            .ended_retention(Duration::from_secs(3600))
            .build();
        assert_eq!(sweep_period(&long), CLEANUP_INTERVAL);
    }
}
