//! Commands sent to the app actor by `SyncHandle` callers.

use fogsync_protocol::{CreateSessionRequest, CreateSessionResponse};
use tokio::sync::oneshot;

use crate::error::SyncError;
use crate::links::LinkKind;
use crate::selection::View;

pub type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

pub enum AppCommand {
    // -- Lifecycle --
    Bootstrap {
        reply: Reply<()>,
    },
    /// Stop the timer and the stream, then end the actor loop.
    Destroy {
        reply: oneshot::Sender<()>,
    },

    // -- Directory --
    RefreshSessions {
        reply: Reply<()>,
    },
    RefreshAll {
        reply: Reply<()>,
    },

    // -- Selection --
    SelectSession {
        session_id: String,
        follow_latest: bool,
        reply: Reply<()>,
    },
    SelectRun {
        run_id: String,
        reply: Reply<()>,
    },
    LoadDetail {
        reply: Reply<()>,
    },
    /// Fire-and-forget.
    SetView {
        view: View,
    },

    // -- Mutations against the daemon --
    CreateSession {
        request: CreateSessionRequest,
        reply: Reply<CreateSessionResponse>,
    },
    CreateFollowup {
        session_id: String,
        prompt: String,
        reply: Reply<String>,
    },
    OpenLink {
        kind: LinkKind,
        reply: Reply<String>,
    },
}
