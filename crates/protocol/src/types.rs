//! Core types shared across the protocol

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state shared by sessions (`status`) and runs (`state`).
///
/// Serialized as the daemon's SCREAMING_SNAKE_CASE names. Names this crate
/// does not know are kept verbatim in `Other` and count as terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunState {
    Created,
    Setup,
    AiRunning,
    Validating,
    Committed,
    PrCreated,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

/// States that denote in-progress work warranting live observation.
pub const ACTIVE_STATES: [RunState; 6] = [
    RunState::Created,
    RunState::Setup,
    RunState::AiRunning,
    RunState::Validating,
    RunState::Committed,
    RunState::PrCreated,
];

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::Created => "CREATED",
            RunState::Setup => "SETUP",
            RunState::AiRunning => "AI_RUNNING",
            RunState::Validating => "VALIDATING",
            RunState::Committed => "COMMITTED",
            RunState::PrCreated => "PR_CREATED",
            RunState::Completed => "COMPLETED",
            RunState::Failed => "FAILED",
            RunState::Cancelled => "CANCELLED",
            RunState::Other(name) => name,
        }
    }

    /// Membership in [`ACTIVE_STATES`]. Everything else is terminal.
    pub fn is_active(&self) -> bool {
        ACTIVE_STATES.contains(self)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunState::Failed)
    }
}

/// A missing `state` or `status` field is an unnamed, terminal state.
impl Default for RunState {
    fn default() -> Self {
        RunState::Other(String::new())
    }
}

impl From<String> for RunState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CREATED" => RunState::Created,
            "SETUP" => RunState::Setup,
            "AI_RUNNING" => RunState::AiRunning,
            "VALIDATING" => RunState::Validating,
            "COMMITTED" => RunState::Committed,
            "PR_CREATED" => RunState::PrCreated,
            "COMPLETED" => RunState::Completed,
            "FAILED" => RunState::Failed,
            "CANCELLED" => RunState::Cancelled,
            _ => RunState::Other(value),
        }
    }
}

impl From<&str> for RunState {
    fn from(value: &str) -> Self {
        RunState::from(value.to_string())
    }
}

impl From<RunState> for String {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution attempt within a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub state: RunState,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Summary of a session for list views
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub repo_name: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub status: RunState,
    #[serde(default)]
    pub busy: bool,
    #[serde(default)]
    pub autopr: bool,
    #[serde(default)]
    pub pr_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_run: Option<RunSummary>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl SessionSummary {
    /// Latest known run state, falling back to the session status.
    pub fn effective_state(&self) -> &RunState {
        self.latest_run
            .as_ref()
            .map(|run| &run.state)
            .unwrap_or(&self.status)
    }
}

/// A single entry in a run's timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub id: u64,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RunEvent {
    /// Human-readable body: the message, else the raw data, else "-".
    pub fn body(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        match &self.data {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "-".to_string(),
        }
    }
}

/// Daemon settings (read-only for sync clients)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub default_tool: String,
    #[serde(default)]
    pub branch_prefix: String,
    #[serde(default)]
    pub has_github_token: bool,
    #[serde(default)]
    pub onboarding_required: bool,
    #[serde(default)]
    pub available_tools: Vec<String>,
}

/// A managed repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub base_worktree_path: String,
}

/// Working-tree diff of a session branch against its base
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    #[serde(default)]
    pub base_branch: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub stat: String,
    #[serde(default)]
    pub patch: String,
}
