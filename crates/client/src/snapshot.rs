//! Read-only views of the application state handed to consumers.

use fogsync_protocol::{Repo, RunEvent, RunSummary, SessionSummary, Settings};
use serde::Serialize;

use crate::detail::DetailState;
use crate::directory::{completed_sessions, running_sessions};
use crate::links::SessionLinks;
use crate::selection::Selection;
use crate::stream::StreamKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Unavailable,
}

/// Why a live stream was closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StreamCloseReason {
    /// The daemon reported the run complete.
    Done,
    /// Transport failure; the next detail load may reopen it.
    Error(String),
    /// Another run, session or view took its place.
    Superseded,
    /// The selected run reached a terminal state.
    Terminal,
    /// The selection went away.
    Cleared,
    Teardown,
}

/// Change notifications broadcast after each step of the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncNotice {
    ConnectionChanged {
        status: ConnectionStatus,
    },
    SessionsRefreshed {
        count: usize,
    },
    /// The selected session disappeared from the directory.
    SelectionCleared {
        session_id: String,
    },
    DetailLoaded {
        session_id: String,
        run_id: String,
        events: usize,
    },
    DetailNotFound {
        session_id: String,
    },
    DiffFailed {
        session_id: String,
        message: String,
    },
    EventAppended {
        session_id: String,
        run_id: String,
        event: RunEvent,
    },
    StreamOpened {
        key: StreamKey,
        cursor: u64,
    },
    StreamClosed {
        key: StreamKey,
        reason: StreamCloseReason,
    },
}

/// Consistent copy of everything a consumer renders.
///
/// `revision` increases by one per published snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppSnapshot {
    pub revision: u64,
    pub connection: ConnectionStatus,
    pub version: String,
    pub settings: Option<Settings>,
    pub repos: Vec<Repo>,
    pub sessions: Vec<SessionSummary>,
    pub selection: Selection,
    pub detail: DetailState,
    pub links: SessionLinks,
    pub stream: Option<StreamKey>,
}

impl AppSnapshot {
    pub fn running_sessions(&self) -> Vec<&SessionSummary> {
        running_sessions(&self.sessions)
    }

    pub fn completed_sessions(&self) -> Vec<&SessionSummary> {
        completed_sessions(&self.sessions)
    }

    pub fn selected_run(&self) -> Option<&RunSummary> {
        self.detail.selected_run(&self.selection.run_id)
    }

    pub fn latest_run(&self) -> Option<&RunSummary> {
        self.detail.latest_run()
    }

    pub fn can_stop(&self) -> bool {
        self.detail.can_stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_serialize_with_type_tag() {
        let notice = SyncNotice::StreamClosed {
            key: StreamKey::new("s1", "r1"),
            reason: StreamCloseReason::Error("reset".to_string()),
        };
        let value = serde_json::to_value(&notice).expect("serialize");
        assert_eq!(value["type"], "stream_closed");
        assert_eq!(value["key"]["run_id"], "r1");
        assert_eq!(value["reason"]["reason"], "error");
        assert_eq!(value["reason"]["detail"], "reset");
    }

    #[test]
    fn empty_snapshot_is_connecting_with_nothing_selected() {
        let snapshot = AppSnapshot::default();
        assert_eq!(snapshot.connection, ConnectionStatus::Connecting);
        assert!(snapshot.selected_run().is_none());
        assert!(!snapshot.can_stop());
        assert!(snapshot.selection.auto_follow_latest);
    }
}
