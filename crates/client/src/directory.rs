//! Directory synchronization: settings, repositories and the session list.

use fogsync_protocol::SessionSummary;
use tracing::{info, warn};

use crate::detail::DetailState;
use crate::error::SyncError;
use crate::snapshot::{ConnectionStatus, StreamCloseReason, SyncNotice};
use crate::state::AppState;

/// Busy, or its effective state is still active.
pub fn is_session_running(session: &SessionSummary) -> bool {
    session.busy || session.effective_state().is_active()
}

pub fn running_sessions(sessions: &[SessionSummary]) -> Vec<&SessionSummary> {
    sessions.iter().filter(|s| is_session_running(s)).collect()
}

pub fn completed_sessions(sessions: &[SessionSummary]) -> Vec<&SessionSummary> {
    sessions.iter().filter(|s| !is_session_running(s)).collect()
}

impl AppState {
    pub async fn refresh_sessions(&mut self) -> Result<(), SyncError> {
        let sessions = self.api.fetch_sessions().await?;
        self.apply_sessions(sessions);
        Ok(())
    }

    /// Fetch settings, repositories and sessions together, then reload the
    /// selected session's detail.
    pub async fn refresh_all(&mut self) -> Result<(), SyncError> {
        let (settings, repos, sessions) = futures::try_join!(
            self.api.fetch_settings(),
            self.api.fetch_repos(),
            self.api.fetch_sessions(),
        )?;
        self.settings = Some(settings);
        self.repos = repos;
        self.apply_sessions(sessions);
        if self.selection.has_session() {
            self.load_detail().await?;
        }
        Ok(())
    }

    /// Replace the list; drop the selection if its session vanished.
    fn apply_sessions(&mut self, sessions: Vec<SessionSummary>) {
        self.sessions = sessions;
        self.push_notice(SyncNotice::SessionsRefreshed {
            count: self.sessions.len(),
        });

        let selected = &self.selection.session_id;
        if selected.is_empty() || self.sessions.iter().any(|s| &s.id == selected) {
            return;
        }
        let session_id = selected.clone();
        self.close_stream(StreamCloseReason::Cleared);
        self.selection.clear_session();
        self.detail = DetailState::default();
        info!(
            component = "directory",
            event = "selection.cleared",
            session_id = %session_id,
            "Selected session no longer listed"
        );
        self.push_notice(SyncNotice::SelectionCleared { session_id });
    }

    /// One polling step: list first, then the detail it may depend on.
    pub(crate) async fn tick(&mut self) {
        match self.poll_once().await {
            Ok(()) => self.set_connection(ConnectionStatus::Connected),
            Err(e) => {
                warn!(
                    component = "directory",
                    event = "poll.failed",
                    error = %e,
                    "Polling tick failed"
                );
                self.set_connection(ConnectionStatus::Unavailable);
            }
        }
    }

    async fn poll_once(&mut self) -> Result<(), SyncError> {
        self.refresh_sessions().await?;
        if self.selection.wants_detail() {
            self.load_detail().await?;
        }
        Ok(())
    }
}
