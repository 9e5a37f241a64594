//! App actor. Owns the `AppState` and processes commands, timer ticks and
//! stream signals strictly one at a time.
//!
//! Callers talk to it through `SyncHandle`, which sends `AppCommand`
//! messages over an mpsc channel. Lock-free reads go through `ArcSwap`;
//! change notices fan out over a broadcast channel.

use std::sync::Arc;

use arc_swap::ArcSwap;
use fogsync_protocol::{CreateSessionRequest, CreateSessionResponse};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::app_command::{AppCommand, Reply};
use crate::error::SyncError;
use crate::links::LinkKind;
use crate::selection::View;
use crate::snapshot::{AppSnapshot, SyncNotice};
use crate::state::AppState;
use crate::stream::Signal;

const COMMAND_CAPACITY: usize = 256;
const NOTICE_CAPACITY: usize = 512;

/// Handle to the running app actor (cheap to Clone).
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<AppCommand>,
    snapshot: Arc<ArcSwap<AppSnapshot>>,
    notices: broadcast::Sender<SyncNotice>,
}

impl SyncHandle {
    /// Spawn the actor around `state`. `signals` is the receiver returned
    /// by [`AppState::new`].
    pub fn spawn(state: AppState, signals: mpsc::UnboundedReceiver<Signal>) -> SyncHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let snapshot = Arc::new(ArcSwap::from_pointee(state.snapshot(0)));

        tokio::spawn(actor_loop(
            state,
            command_rx,
            signals,
            snapshot.clone(),
            notices.clone(),
        ));

        SyncHandle {
            command_tx,
            snapshot,
            notices,
        }
    }

    /// Lock-free snapshot read.
    pub fn snapshot(&self) -> Arc<AppSnapshot> {
        self.snapshot.load_full()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> AppCommand,
    ) -> Result<T, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(build(reply))
            .await
            .map_err(|_| SyncError::ActorClosed)?;
        rx.await.map_err(|_| SyncError::ActorClosed)?
    }

    pub async fn bootstrap(&self) -> Result<(), SyncError> {
        self.request(|reply| AppCommand::Bootstrap { reply }).await
    }

    pub async fn refresh_sessions(&self) -> Result<(), SyncError> {
        self.request(|reply| AppCommand::RefreshSessions { reply }).await
    }

    pub async fn refresh_all(&self) -> Result<(), SyncError> {
        self.request(|reply| AppCommand::RefreshAll { reply }).await
    }

    pub async fn select_session(
        &self,
        session_id: impl Into<String>,
        follow_latest: bool,
    ) -> Result<(), SyncError> {
        let session_id = session_id.into();
        self.request(|reply| AppCommand::SelectSession {
            session_id,
            follow_latest,
            reply,
        })
        .await
    }

    pub async fn select_run(&self, run_id: impl Into<String>) -> Result<(), SyncError> {
        let run_id = run_id.into();
        self.request(|reply| AppCommand::SelectRun { run_id, reply }).await
    }

    pub async fn load_detail(&self) -> Result<(), SyncError> {
        self.request(|reply| AppCommand::LoadDetail { reply }).await
    }

    /// Fire-and-forget view change.
    pub async fn set_view(&self, view: View) {
        if self
            .command_tx
            .send(AppCommand::SetView { view })
            .await
            .is_err()
        {
            warn!(
                component = "app_actor",
                "Actor channel closed, command dropped"
            );
        }
    }

    pub async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, SyncError> {
        self.request(|reply| AppCommand::CreateSession { request, reply }).await
    }

    pub async fn create_followup(
        &self,
        session_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Result<String, SyncError> {
        let session_id = session_id.into();
        let prompt = prompt.into();
        self.request(|reply| AppCommand::CreateFollowup {
            session_id,
            prompt,
            reply,
        })
        .await
    }

    pub async fn open_link(&self, kind: LinkKind) -> Result<String, SyncError> {
        self.request(|reply| AppCommand::OpenLink { kind, reply }).await
    }

    /// Tear the actor down. Calling it again, or after the actor is gone,
    /// is a no-op.
    pub async fn destroy(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .command_tx
            .send(AppCommand::Destroy { reply })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}

/// Publishes the snapshot and drains notices after each step.
struct Publisher {
    revision: u64,
    snapshot: Arc<ArcSwap<AppSnapshot>>,
    notices: broadcast::Sender<SyncNotice>,
}

impl Publisher {
    fn publish(&mut self, state: &mut AppState) {
        self.revision += 1;
        self.snapshot.store(Arc::new(state.snapshot(self.revision)));
        for notice in state.take_notices() {
            // No subscribers is fine.
            let _ = self.notices.send(notice);
        }
    }

    /// Publish, then answer the caller.
    fn reply<T>(&mut self, state: &mut AppState, reply: oneshot::Sender<T>, value: T) {
        self.publish(state);
        let _ = reply.send(value);
    }
}

async fn actor_loop(
    mut state: AppState,
    mut command_rx: mpsc::Receiver<AppCommand>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    snapshot: Arc<ArcSwap<AppSnapshot>>,
    notices: broadcast::Sender<SyncNotice>,
) {
    let mut publisher = Publisher {
        revision: 0,
        snapshot,
        notices,
    };
    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(cmd) => {
                    if handle_command(&mut state, &mut publisher, cmd).await {
                        break;
                    }
                }
                // Every handle is gone.
                None => {
                    state.destroy();
                    publisher.publish(&mut state);
                    break;
                }
            },
            Some(signal) = signals.recv() => {
                state.handle_signal(signal).await;
                publisher.publish(&mut state);
            }
        }
    }
    debug!(
        component = "app_actor",
        event = "app_actor.stopped",
        revision = publisher.revision,
        "App actor stopped"
    );
}

/// Returns true when the actor should stop.
async fn handle_command(state: &mut AppState, publisher: &mut Publisher, cmd: AppCommand) -> bool {
    match cmd {
        AppCommand::Bootstrap { reply } => {
            let result = state.bootstrap().await;
            publisher.reply(state, reply, result);
        }
        AppCommand::Destroy { reply } => {
            state.destroy();
            publisher.reply(state, reply, ());
            return true;
        }
        AppCommand::RefreshSessions { reply } => {
            let result = state.refresh_sessions().await;
            publisher.reply(state, reply, result);
        }
        AppCommand::RefreshAll { reply } => {
            let result = state.refresh_all().await;
            publisher.reply(state, reply, result);
        }
        AppCommand::SelectSession {
            session_id,
            follow_latest,
            reply,
        } => {
            let result = state.select_session(&session_id, follow_latest).await;
            publisher.reply(state, reply, result);
        }
        AppCommand::SelectRun { run_id, reply } => {
            let result = state.select_run(&run_id).await;
            publisher.reply(state, reply, result);
        }
        AppCommand::LoadDetail { reply } => {
            let result = state.load_detail().await;
            publisher.reply(state, reply, result);
        }
        AppCommand::SetView { view } => {
            state.set_view(view);
            publisher.publish(state);
        }
        AppCommand::CreateSession { request, reply } => {
            let result = state.create_session(request).await;
            publisher.reply(state, reply, result);
        }
        AppCommand::CreateFollowup {
            session_id,
            prompt,
            reply,
        } => {
            let result = state.create_followup(&session_id, &prompt).await;
            publisher.reply(state, reply, result);
        }
        AppCommand::OpenLink { kind, reply } => {
            let result = state.open_link(kind);
            publisher.reply(state, reply, result);
        }
    }
    false
}
