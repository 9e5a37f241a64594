//! Daemon → client response bodies and live stream framing

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::*;

/// SSE event name the daemon sends once a run's stream is complete.
pub const STREAM_DONE_EVENT: &str = "done";

/// SSE event name carrying a daemon-side stream failure message.
pub const STREAM_ERROR_EVENT: &str = "error";

/// Response of `GET sessions/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(default)]
    pub session: Option<SessionSummary>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub runs: Vec<RunSummary>,
}

/// The daemon encodes a session without runs as `"runs": null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SessionDetail {
    /// The session, unless the daemon answered with an empty placeholder.
    pub fn found_session(&self) -> Option<&SessionSummary> {
        self.session.as_ref().filter(|s| !s.id.is_empty())
    }
}

/// Response of `POST sessions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `POST sessions/{id}/runs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRunResponse {
    pub run_id: String,
    #[serde(default)]
    pub status: Option<String>,
}
