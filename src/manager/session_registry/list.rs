//! Session listing functionality

use crate::types::session::SessionSummary;

use super::core::SessionRegistry;

impl SessionRegistry {
    /// List sessions, oldest first
    ///
    /// Live sessions always; ended sessions still within their retention
    /// period only when `include_ended` is set.
    #[must_use]
    pub fn list(&self, include_ended: bool) -> Vec<SessionSummary> {
        let mut sessions: Vec<SessionSummary> = self
            .inner
            .live
            .read()
            .values()
            .map(|session| session.summary())
            .filter(|summary| include_ended || !summary.state.is_ended())
            .collect();

        if include_ended {
            let retention = self.inner.options.ended_retention;
            sessions.extend(
                self.inner
                    .ended
                    .read()
                    .values()
                    .filter(|ended| !ended.is_expired(retention))
                    .map(|ended| ended.summary.clone()),
            );
        }

        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        sessions
    }
}
