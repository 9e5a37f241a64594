//! Session detail loading.
//!
//! A load fetches the session with its runs, picks the run to display,
//! fetches that run's backlog and only then commits. The diff is loaded
//! last and never invalidates what was committed before it.

use fogsync_protocol::{DiffResult, RunSummary, SessionDetail, SessionSummary};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::selection::{pick_run, View};
use crate::snapshot::{StreamCloseReason, SyncNotice};
use crate::state::AppState;
use crate::stream::StreamKey;
use crate::timeline::Timeline;

pub const SESSION_NOT_FOUND: &str = "Session not found.";
const DIFF_FALLBACK_ERROR: &str = "Failed to load diff";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailStatus {
    /// Nothing selected, or nothing loaded yet.
    #[default]
    Empty,
    Loaded,
    /// The daemon does not know the selected session.
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailState {
    pub status: DetailStatus,
    pub session: Option<SessionSummary>,
    /// Most recent first.
    pub runs: Vec<RunSummary>,
    pub timeline: Timeline,
    pub diff: Option<DiffResult>,
    /// Last diff failure; empty after a successful diff load.
    pub diff_error: String,
}

impl DetailState {
    pub fn not_found() -> Self {
        Self {
            status: DetailStatus::NotFound,
            diff_error: SESSION_NOT_FOUND.to_string(),
            ..Self::default()
        }
    }

    fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    /// The run matching `run_id`, else the most recent run.
    pub fn selected_run(&self, run_id: &str) -> Option<&RunSummary> {
        self.runs
            .iter()
            .find(|r| r.id == run_id)
            .or_else(|| self.runs.first())
    }

    pub fn latest_run(&self) -> Option<&RunSummary> {
        self.runs.first()
    }

    /// The session is busy and its most recent run has not finished.
    pub fn can_stop(&self) -> bool {
        let busy = self.session.as_ref().is_some_and(|s| s.busy);
        busy && self.latest_run().is_some_and(|r| r.state.is_active())
    }
}

impl AppState {
    /// Reload the selected session's detail and reconcile the live stream.
    ///
    /// On a fetch failure nothing is committed and the error is returned.
    pub async fn load_detail(&mut self) -> Result<(), SyncError> {
        let session_id = self.selection.session_id.clone();
        if session_id.is_empty() {
            self.close_stream(StreamCloseReason::Cleared);
            self.detail = DetailState::default();
            return Ok(());
        }

        let detail = self.api.fetch_session_detail(&session_id).await?;
        let Some(SessionDetail { session, runs }) =
            detail.filter(|d| d.found_session().is_some())
        else {
            self.mark_not_found(session_id);
            return Ok(());
        };

        let run_id = pick_run(
            self.selection.auto_follow_latest,
            &self.selection.run_id,
            &runs,
        );
        let backlog = if run_id.is_empty() {
            Vec::new()
        } else {
            self.api
                .fetch_run_events(&session_id, &run_id, self.config.event_page_limit)
                .await?
        };

        let same_run = !run_id.is_empty()
            && self.detail.session_id() == Some(session_id.as_str())
            && self.detail.timeline.run_id() == run_id;
        if let Some(key) = self.stream.key() {
            if key.session_id != session_id || key.run_id != run_id {
                self.close_stream(StreamCloseReason::Superseded);
            }
        }

        self.selection.run_id = run_id.clone();
        self.detail.status = DetailStatus::Loaded;
        self.detail.session = session;
        self.detail.runs = runs;
        if same_run {
            let added = self.detail.timeline.merge_all(backlog);
            debug!(
                component = "detail",
                event = "detail.backlog.merged",
                session_id = %session_id,
                run_id = %run_id,
                added,
                "Merged backlog into existing timeline"
            );
        } else {
            self.detail.timeline = Timeline::from_backlog(run_id.clone(), backlog);
        }
        self.push_notice(SyncNotice::DetailLoaded {
            session_id: session_id.clone(),
            run_id,
            events: self.detail.timeline.len(),
        });

        self.load_diff(&session_id).await;
        self.arm_stream();
        Ok(())
    }

    fn mark_not_found(&mut self, session_id: String) {
        self.close_stream(StreamCloseReason::Cleared);
        self.selection.run_id.clear();
        self.detail = DetailState::not_found();
        info!(
            component = "detail",
            event = "detail.not_found",
            session_id = %session_id,
            "Selected session is unknown to the daemon"
        );
        self.push_notice(SyncNotice::DetailNotFound { session_id });
    }

    async fn load_diff(&mut self, session_id: &str) {
        match self.api.fetch_diff(session_id).await {
            Ok(diff) => {
                self.detail.diff = Some(diff);
                self.detail.diff_error.clear();
            }
            Err(e) => {
                let message = match e.to_string() {
                    m if m.trim().is_empty() => DIFF_FALLBACK_ERROR.to_string(),
                    m => m,
                };
                warn!(
                    component = "detail",
                    event = "detail.diff.failed",
                    session_id = %session_id,
                    error = %message,
                    "Diff fetch failed"
                );
                self.detail.diff = None;
                self.detail.diff_error = message.clone();
                self.push_notice(SyncNotice::DiffFailed {
                    session_id: session_id.to_string(),
                    message,
                });
            }
        }
    }

    /// Open or close the live stream to match the committed selection.
    fn arm_stream(&mut self) {
        if !self.selection.has_session() || !self.selection.has_run() {
            self.close_stream(StreamCloseReason::Cleared);
            return;
        }
        if self.selection.view != View::Detail {
            self.close_stream(StreamCloseReason::Superseded);
            return;
        }
        let active = self
            .detail
            .selected_run(&self.selection.run_id)
            .is_some_and(|r| r.state.is_active());
        if !active {
            self.close_stream(StreamCloseReason::Terminal);
            return;
        }

        let key = StreamKey::new(
            self.selection.session_id.clone(),
            self.selection.run_id.clone(),
        );
        let cursor = self.detail.timeline.cursor();
        if self.stream.open(key.clone(), cursor) {
            self.push_notice(SyncNotice::StreamOpened { key, cursor });
        }
    }
}
