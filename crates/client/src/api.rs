//! Remote access layer: typed fetch and stream primitives against the daemon.

use async_trait::async_trait;
use futures::stream::BoxStream;
use fogsync_protocol::{
    CreateRunRequest, CreateRunResponse, CreateSessionRequest, CreateSessionResponse,
    DiffResult, Repo, RunEvent, SessionDetail, SessionSummary, Settings,
};

use crate::error::ApiError;

/// Where the daemon lives and how to authenticate against it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    /// Base address without the `/api` suffix, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Bearer token; empty disables the `Authorization` header.
    pub token: String,
}

/// One frame of a run's live stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Event(RunEvent),
    /// The daemon finished streaming this run.
    Done,
}

/// A live stream. `Err` items are transport errors and end the stream.
pub type RunEventStream = BoxStream<'static, Result<StreamFrame, ApiError>>;

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Point the client at a daemon. Called once during bootstrap.
    fn configure(&self, endpoint: Endpoint);

    async fn fetch_settings(&self) -> Result<Settings, ApiError>;

    async fn fetch_repos(&self) -> Result<Vec<Repo>, ApiError>;

    async fn fetch_sessions(&self) -> Result<Vec<SessionSummary>, ApiError>;

    /// `Ok(None)` when the daemon does not know the session.
    async fn fetch_session_detail(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionDetail>, ApiError>;

    /// Most recent `limit` events of a run, ascending by id.
    async fn fetch_run_events(
        &self,
        session_id: &str,
        run_id: &str,
        limit: usize,
    ) -> Result<Vec<RunEvent>, ApiError>;

    async fn fetch_diff(&self, session_id: &str) -> Result<DiffResult, ApiError>;

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, ApiError>;

    async fn create_run(
        &self,
        session_id: &str,
        request: &CreateRunRequest,
    ) -> Result<CreateRunResponse, ApiError>;

    /// Open the live stream of a run, replaying only events with id > `cursor`.
    async fn open_run_stream(
        &self,
        session_id: &str,
        run_id: &str,
        cursor: u64,
    ) -> Result<RunEventStream, ApiError>;
}
