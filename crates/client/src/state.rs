//! Application state aggregate.
//!
//! `AppState` owns the directory, the selection, the detail view, the live
//! stream and the polling timer. It is driven by exactly one task (see
//! [`crate::app_actor`]), which calls its async operations one at a time.

use std::sync::Arc;

use fogsync_protocol::{
    CreateRunRequest, CreateSessionRequest, CreateSessionResponse, Repo, RunSummary,
    SessionSummary, Settings,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::{Endpoint, RemoteApi};
use crate::config::SyncConfig;
use crate::detail::DetailState;
use crate::error::SyncError;
use crate::host::{HostBridge, UNKNOWN_VERSION};
use crate::links::{session_links, LinkKind, SessionLinks};
use crate::selection::{Selection, View};
use crate::snapshot::{AppSnapshot, ConnectionStatus, StreamCloseReason, SyncNotice};
use crate::stream::{EventStreamController, Signal, StreamKey, StreamSignal, StreamSignalKind};

pub struct AppState {
    pub(crate) api: Arc<dyn RemoteApi>,
    host: Arc<dyn HostBridge>,
    pub(crate) config: SyncConfig,
    connection: ConnectionStatus,
    version: String,
    pub(crate) settings: Option<Settings>,
    pub(crate) repos: Vec<Repo>,
    pub(crate) sessions: Vec<SessionSummary>,
    pub(crate) selection: Selection,
    pub(crate) detail: DetailState,
    pub(crate) stream: EventStreamController,
    poller: Option<JoinHandle<()>>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    notices: Vec<SyncNotice>,
}

impl AppState {
    /// Build an idle state. Timer ticks and stream frames arrive on the
    /// returned receiver and must be fed back through [`Self::handle_signal`].
    pub fn new(
        api: Arc<dyn RemoteApi>,
        host: Arc<dyn HostBridge>,
        config: SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let stream = EventStreamController::new(api.clone(), signal_tx.clone());
        let state = Self {
            api,
            host,
            config,
            connection: ConnectionStatus::Connecting,
            version: UNKNOWN_VERSION.to_string(),
            settings: None,
            repos: Vec::new(),
            sessions: Vec::new(),
            selection: Selection::default(),
            detail: DetailState::default(),
            stream,
            poller: None,
            signal_tx,
            notices: Vec::new(),
        };
        (state, signal_rx)
    }

    // Accessors

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub fn repos(&self) -> &[Repo] {
        &self.repos
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn detail(&self) -> &DetailState {
        &self.detail
    }

    pub fn stream_key(&self) -> Option<&StreamKey> {
        self.stream.key()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
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

    pub fn links(&self) -> SessionLinks {
        self.detail
            .session
            .as_ref()
            .map(|s| session_links(s, &self.repos))
            .unwrap_or_default()
    }

    pub fn snapshot(&self, revision: u64) -> AppSnapshot {
        AppSnapshot {
            revision,
            connection: self.connection,
            version: self.version.clone(),
            settings: self.settings.clone(),
            repos: self.repos.clone(),
            sessions: self.sessions.clone(),
            selection: self.selection.clone(),
            detail: self.detail.clone(),
            links: self.links(),
            stream: self.stream.key().cloned(),
        }
    }

    /// Drain notices accumulated since the last call.
    pub fn take_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn push_notice(&mut self, notice: SyncNotice) {
        self.notices.push(notice);
    }

    pub(crate) fn set_connection(&mut self, status: ConnectionStatus) {
        if self.connection == status {
            return;
        }
        info!(
            component = "app_state",
            event = "connection.changed",
            from = ?self.connection,
            to = ?status,
            "Connection status changed"
        );
        self.connection = status;
        self.push_notice(SyncNotice::ConnectionChanged { status });
    }

    pub(crate) fn close_stream(&mut self, reason: StreamCloseReason) {
        if let Some(key) = self.stream.close() {
            self.push_notice(SyncNotice::StreamClosed { key, reason });
        }
    }

    // Lifecycle

    /// Resolve the daemon endpoint, load the directory and start polling.
    ///
    /// On failure the connection is marked unavailable and no timer runs.
    pub async fn bootstrap(&mut self) -> Result<(), SyncError> {
        self.set_connection(ConnectionStatus::Connecting);
        match self.try_bootstrap().await {
            Ok(()) => {
                self.set_connection(ConnectionStatus::Connected);
                self.start_polling();
                info!(
                    component = "app_state",
                    event = "bootstrap.complete",
                    sessions = self.sessions.len(),
                    version = %self.version,
                    "Bootstrap complete"
                );
                Ok(())
            }
            Err(e) => {
                self.set_connection(ConnectionStatus::Unavailable);
                error!(
                    component = "app_state",
                    event = "bootstrap.failed",
                    error = %e,
                    "Bootstrap failed"
                );
                Err(SyncError::Initialization(e.to_string()))
            }
        }
    }

    async fn try_bootstrap(&mut self) -> anyhow::Result<()> {
        let base_url = self.host.api_base_url().await?;
        let token = self.host.api_token().await?;
        self.api.configure(Endpoint { base_url, token });
        self.version = self.host.version().await?;
        self.refresh_all().await?;
        Ok(())
    }

    pub(crate) fn start_polling(&mut self) {
        self.stop_polling();
        let period = self.config.poll_interval;
        let tx = self.signal_tx.clone();
        self.poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(Signal::Tick).is_err() {
                    break;
                }
            }
        }));
        debug!(
            component = "app_state",
            event = "polling.started",
            interval_ms = period.as_millis() as u64,
            "Polling started"
        );
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    /// Stop the timer and close the live stream. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        let was_polling = self.poller.is_some();
        self.stop_polling();
        self.close_stream(StreamCloseReason::Teardown);
        if was_polling {
            info!(
                component = "app_state",
                event = "app_state.destroyed",
                "Application state torn down"
            );
        }
    }

    // Selection

    /// Switch to another session: forget the old detail and stream.
    fn focus_session(&mut self, session_id: &str) {
        if self.selection.session_id == session_id {
            return;
        }
        self.close_stream(StreamCloseReason::Superseded);
        self.selection.session_id = session_id.to_string();
        self.selection.run_id.clear();
        self.detail = DetailState::default();
    }

    /// Show `session_id` in the detail view. With `follow_latest` the view
    /// tracks the most recent run from now on.
    pub async fn select_session(
        &mut self,
        session_id: &str,
        follow_latest: bool,
    ) -> Result<(), SyncError> {
        self.focus_session(session_id);
        if follow_latest {
            self.selection.auto_follow_latest = true;
        }
        self.selection.view = View::Detail;
        self.load_detail().await
    }

    /// Pin `run_id`; automatic following stops until re-enabled.
    /// A failed load restores the previous pin.
    pub async fn select_run(&mut self, run_id: &str) -> Result<(), SyncError> {
        let previous_run = std::mem::replace(&mut self.selection.run_id, run_id.to_string());
        let was_following = std::mem::replace(&mut self.selection.auto_follow_latest, false);
        if self.stream.key().is_some_and(|k| k.run_id != run_id) {
            self.close_stream(StreamCloseReason::Superseded);
        }
        let result = self.load_detail().await;
        if result.is_err() {
            self.selection.run_id = previous_run;
            self.selection.auto_follow_latest = was_following;
        }
        result
    }

    pub fn set_view(&mut self, view: View) {
        self.selection.view = view;
        if view != View::Detail {
            self.close_stream(StreamCloseReason::Superseded);
        }
    }

    // Signals

    pub async fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Tick => self.tick().await,
            Signal::Stream(signal) => self.handle_stream_signal(signal).await,
        }
    }

    async fn handle_stream_signal(&mut self, signal: StreamSignal) {
        if !self.stream.accepts(&signal) {
            debug!(
                component = "app_state",
                event = "stream.signal.stale",
                generation = signal.generation,
                "Ignoring signal from a closed stream"
            );
            return;
        }
        let StreamSignal { key, kind, .. } = signal;
        match kind {
            StreamSignalKind::Event(event) => {
                if self.detail.timeline.run_id() != key.run_id {
                    return;
                }
                if self.detail.timeline.merge(event.clone()) {
                    self.push_notice(SyncNotice::EventAppended {
                        session_id: key.session_id,
                        run_id: key.run_id,
                        event,
                    });
                }
            }
            StreamSignalKind::Done => {
                self.close_stream(StreamCloseReason::Done);
                if let Err(e) = self.refresh_sessions().await {
                    warn!(
                        component = "app_state",
                        event = "stream.done.refresh_failed",
                        error = %e,
                        "Session refresh after stream completion failed"
                    );
                }
            }
            StreamSignalKind::Error(message) => {
                warn!(
                    component = "app_state",
                    event = "stream.transport_error",
                    session_id = %key.session_id,
                    run_id = %key.run_id,
                    error = %message,
                    "Run stream failed"
                );
                self.close_stream(StreamCloseReason::Error(message));
            }
        }
    }

    // Creation and links

    pub async fn create_session(
        &mut self,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, SyncError> {
        if request.repo.trim().is_empty() {
            return Err(SyncError::Validation("Repository is required".to_string()));
        }
        if request.prompt.trim().is_empty() {
            return Err(SyncError::Validation("Prompt is required".to_string()));
        }
        let response = self.api.create_session(&request).await?;
        info!(
            component = "app_state",
            event = "session.created",
            session_id = %response.session_id,
            repo = %request.repo,
            "Session created"
        );
        self.refresh_sessions().await?;
        if !response.session_id.is_empty() {
            self.select_session(&response.session_id, true).await?;
        }
        Ok(response)
    }

    /// Start a follow-up run and show it pinned.
    pub async fn create_followup(
        &mut self,
        session_id: &str,
        prompt: &str,
    ) -> Result<String, SyncError> {
        if session_id.trim().is_empty() {
            return Err(SyncError::Validation("Session is required".to_string()));
        }
        if prompt.trim().is_empty() {
            return Err(SyncError::Validation("Prompt is required".to_string()));
        }
        let request = CreateRunRequest {
            prompt: prompt.to_string(),
            run_async: true,
        };
        let response = self.api.create_run(session_id, &request).await?;
        info!(
            component = "app_state",
            event = "run.created",
            session_id = %session_id,
            run_id = %response.run_id,
            "Follow-up run created"
        );
        self.refresh_sessions().await?;
        if response.run_id.is_empty() {
            self.select_session(session_id, true).await?;
        } else {
            self.focus_session(session_id);
            self.selection.view = View::Detail;
            self.select_run(&response.run_id).await?;
        }
        Ok(response.run_id)
    }

    /// Hand the requested link of the detail session to the host.
    pub fn open_link(&self, kind: LinkKind) -> Result<String, SyncError> {
        let links = self.links();
        let url = links
            .get(kind)
            .ok_or_else(|| SyncError::Validation(format!("No {kind:?} link for this session")))?;
        self.host.open_external(url);
        Ok(url.to_string())
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
