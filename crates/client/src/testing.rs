//! In-memory [`RemoteApi`] for engine tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::StreamExt;
use fogsync_protocol::{
    CreateRunRequest, CreateRunResponse, CreateSessionRequest, CreateSessionResponse,
    DiffResult, Repo, RunEvent, RunState, RunSummary, SessionDetail, SessionSummary, Settings,
};
use tokio::sync::mpsc;

use crate::api::{Endpoint, RemoteApi, RunEventStream, StreamFrame};
use crate::config::SyncConfig;
use crate::error::ApiError;
use crate::host::HostBridge;
use crate::state::AppState;
use crate::stream::{Signal, StreamKey};

pub(crate) fn event(id: u64, run_id: &str) -> RunEvent {
    RunEvent {
        id,
        run_id: run_id.to_string(),
        event_type: "log".to_string(),
        message: Some(format!("event {id}")),
        ..RunEvent::default()
    }
}

pub(crate) fn run(id: &str, session_id: &str, state: RunState) -> RunSummary {
    RunSummary {
        id: id.to_string(),
        session_id: session_id.to_string(),
        prompt: format!("prompt for {id}"),
        state,
        ..RunSummary::default()
    }
}

pub(crate) fn session(id: &str, status: RunState) -> SessionSummary {
    SessionSummary {
        id: id.to_string(),
        repo_name: "fog".to_string(),
        branch: format!("fog/{id}"),
        tool: "claude".to_string(),
        status,
        ..SessionSummary::default()
    }
}

pub(crate) struct FakeStream {
    pub key: StreamKey,
    pub cursor: u64,
    tx: fmpsc::UnboundedSender<Result<StreamFrame, ApiError>>,
}

#[derive(Default)]
struct FakeInner {
    endpoint: Option<Endpoint>,
    settings: Settings,
    repos: Vec<Repo>,
    sessions: Vec<SessionSummary>,
    /// session id -> runs, most recent first
    details: HashMap<String, Vec<RunSummary>>,
    events: HashMap<(String, String), Vec<RunEvent>>,
    diff_error: Option<String>,
    fail_reads: bool,
    stream_open_error: Option<String>,
    streams: Vec<FakeStream>,
    calls: Vec<String>,
    created_sessions: Vec<CreateSessionRequest>,
    created_runs: Vec<(String, CreateRunRequest)>,
}

/// Scripted daemon. Sessions known to `details` answer detail requests;
/// everything else is "not found".
#[derive(Default)]
pub(crate) struct FakeApi {
    inner: Mutex<FakeInner>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeInner> {
        self.inner.lock().expect("fake api lock")
    }

    /// Register a session with its runs (most recent first).
    pub fn put_session(&self, summary: SessionSummary, runs: Vec<RunSummary>) {
        let mut inner = self.lock();
        let mut summary = summary;
        summary.latest_run = runs.first().cloned();
        inner.details.insert(summary.id.clone(), runs);
        inner.sessions.retain(|s| s.id != summary.id);
        inner.sessions.insert(0, summary);
    }

    /// Forget a session entirely, as if it had been deleted daemon-side.
    pub fn remove_session(&self, session_id: &str) {
        let mut inner = self.lock();
        inner.sessions.retain(|s| s.id != session_id);
        inner.details.remove(session_id);
    }

    /// Keep a session's runs but answer detail requests without a session.
    pub fn unlist_session(&self, session_id: &str) {
        self.lock().sessions.retain(|s| s.id != session_id);
    }

    /// Drop a session's detail while keeping it in the list.
    pub fn hide_detail(&self, session_id: &str) {
        self.lock().details.remove(session_id);
    }

    pub fn set_run_state(&self, session_id: &str, run_id: &str, state: RunState) {
        let mut inner = self.lock();
        if let Some(runs) = inner.details.get_mut(session_id) {
            for r in runs.iter_mut().filter(|r| r.id == run_id) {
                r.state = state.clone();
            }
        }
        let latest = inner.details.get(session_id).and_then(|r| r.first().cloned());
        if let Some(summary) = inner.sessions.iter_mut().find(|s| s.id == session_id) {
            summary.status = state;
            summary.latest_run = latest;
        }
    }

    pub fn set_events(&self, session_id: &str, run_id: &str, events: Vec<RunEvent>) {
        self.lock()
            .events
            .insert((session_id.to_string(), run_id.to_string()), events);
    }

    pub fn set_repos(&self, repos: Vec<Repo>) {
        self.lock().repos = repos;
    }

    pub fn fail_diff(&self, message: Option<&str>) {
        self.lock().diff_error = message.map(str::to_string);
    }

    /// Make every read fail, as an unreachable daemon would.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_stream_open(&self, message: &str) {
        self.lock().stream_open_error = Some(message.to_string());
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.lock().endpoint.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn created_sessions(&self) -> Vec<CreateSessionRequest> {
        self.lock().created_sessions.clone()
    }

    pub fn created_runs(&self) -> Vec<(String, CreateRunRequest)> {
        self.lock().created_runs.clone()
    }

    pub fn stream_count(&self) -> usize {
        self.lock().streams.len()
    }

    pub fn stream_key(&self, index: usize) -> StreamKey {
        self.lock().streams[index].key.clone()
    }

    pub fn stream_cursor(&self, index: usize) -> u64 {
        self.lock().streams[index].cursor
    }

    pub fn stream_closed(&self, index: usize) -> bool {
        self.lock().streams[index].tx.is_closed()
    }

    /// Number of streams whose consumer is still attached.
    pub fn live_streams(&self) -> usize {
        self.lock().streams.iter().filter(|s| !s.tx.is_closed()).count()
    }

    pub fn push_frame(&self, index: usize, frame: Result<StreamFrame, ApiError>) {
        let _ = self.lock().streams[index].tx.unbounded_send(frame);
    }

    /// End the body without a terminal frame.
    pub fn end_stream(&self, index: usize) {
        self.lock().streams[index].tx.close_channel();
    }

    pub async fn wait_for_streams(&self, count: usize) {
        for _ in 0..1_000 {
            if self.stream_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} streams, saw {}", self.stream_count());
    }

    pub async fn wait_for_stream_closed(&self, index: usize) {
        for _ in 0..1_000 {
            if self.stream_closed(index) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("stream {index} was never released");
    }

    fn read(&self, call: String) -> Result<MutexGuard<'_, FakeInner>, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if inner.fail_reads {
            return Err(ApiError::Stream("connection refused".to_string()));
        }
        Ok(inner)
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    fn configure(&self, endpoint: Endpoint) {
        self.lock().endpoint = Some(endpoint);
    }

    async fn fetch_settings(&self) -> Result<Settings, ApiError> {
        Ok(self.read("settings".to_string())?.settings.clone())
    }

    async fn fetch_repos(&self) -> Result<Vec<Repo>, ApiError> {
        Ok(self.read("repos".to_string())?.repos.clone())
    }

    async fn fetch_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        Ok(self.read("sessions".to_string())?.sessions.clone())
    }

    async fn fetch_session_detail(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionDetail>, ApiError> {
        let inner = self.read(format!("detail:{session_id}"))?;
        let Some(runs) = inner.details.get(session_id) else {
            return Ok(None);
        };
        let session = inner.sessions.iter().find(|s| s.id == session_id).cloned();
        Ok(Some(SessionDetail {
            session,
            runs: runs.clone(),
        }))
    }

    async fn fetch_run_events(
        &self,
        session_id: &str,
        run_id: &str,
        limit: usize,
    ) -> Result<Vec<RunEvent>, ApiError> {
        let inner = self.read(format!("events:{session_id}/{run_id}"))?;
        let events = inner
            .events
            .get(&(session_id.to_string(), run_id.to_string()))
            .cloned()
            .unwrap_or_default();
        let skip = events.len().saturating_sub(limit);
        Ok(events.into_iter().skip(skip).collect())
    }

    async fn fetch_diff(&self, session_id: &str) -> Result<DiffResult, ApiError> {
        let inner = self.read(format!("diff:{session_id}"))?;
        match &inner.diff_error {
            Some(message) => Err(ApiError::Status {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(DiffResult {
                base_branch: "main".to_string(),
                branch: format!("fog/{session_id}"),
                stat: " 1 file changed".to_string(),
                patch: String::new(),
            }),
        }
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, ApiError> {
        let mut inner = self.lock();
        inner.created_sessions.push(request.clone());
        let n = inner.created_sessions.len();
        let session_id = format!("new-{n}");
        let run_id = format!("new-{n}-run");
        let mut summary = session(&session_id, RunState::Created);
        let first = run(&run_id, &session_id, RunState::Created);
        summary.repo_name = request.repo.clone();
        summary.latest_run = Some(first.clone());
        inner.details.insert(session_id.clone(), vec![first]);
        inner.sessions.insert(0, summary);
        Ok(CreateSessionResponse {
            session_id,
            run_id: Some(run_id),
            status: Some("CREATED".to_string()),
        })
    }

    async fn create_run(
        &self,
        session_id: &str,
        request: &CreateRunRequest,
    ) -> Result<CreateRunResponse, ApiError> {
        let mut inner = self.lock();
        inner
            .created_runs
            .push((session_id.to_string(), request.clone()));
        let Some(runs) = inner.details.get_mut(session_id) else {
            return Err(ApiError::Status {
                status: 404,
                message: "session not found".to_string(),
            });
        };
        let run_id = format!("{session_id}-run-{}", runs.len() + 1);
        runs.insert(0, run(&run_id, session_id, RunState::Created));
        Ok(CreateRunResponse {
            run_id,
            status: Some("CREATED".to_string()),
        })
    }

    async fn open_run_stream(
        &self,
        session_id: &str,
        run_id: &str,
        cursor: u64,
    ) -> Result<RunEventStream, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(format!("stream:{session_id}/{run_id}@{cursor}"));
        if let Some(message) = &inner.stream_open_error {
            return Err(ApiError::Stream(message.clone()));
        }
        let (tx, rx) = fmpsc::unbounded();
        inner.streams.push(FakeStream {
            key: StreamKey::new(session_id, run_id),
            cursor,
            tx,
        });
        Ok(rx.boxed())
    }
}

/// Host with fixed answers that records opened URLs.
#[derive(Default)]
pub(crate) struct FakeHost {
    pub fail: bool,
    opened: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("fake host lock").clone()
    }
}

#[async_trait]
impl HostBridge for FakeHost {
    async fn api_base_url(&self) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("host bridge unavailable");
        }
        Ok("http://fog.test".to_string())
    }

    async fn api_token(&self) -> anyhow::Result<String> {
        Ok("secret".to_string())
    }

    async fn version(&self) -> anyhow::Result<String> {
        Ok("1.2.3".to_string())
    }

    fn open_external(&self, url: &str) {
        self.opened.lock().expect("fake host lock").push(url.to_string());
    }
}

pub(crate) fn app(
    api: &Arc<FakeApi>,
    host: &Arc<FakeHost>,
) -> (AppState, mpsc::UnboundedReceiver<Signal>) {
    AppState::new(api.clone(), host.clone(), SyncConfig::default())
}

/// Deliver the next signal queued for `state`.
pub(crate) async fn pump_signal(
    state: &mut AppState,
    signals: &mut mpsc::UnboundedReceiver<Signal>,
) {
    let signal = signals.recv().await.expect("signal channel open");
    state.handle_signal(signal).await;
}
