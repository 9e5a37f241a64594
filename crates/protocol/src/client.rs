//! Client → daemon request bodies

use serde::{Deserialize, Serialize};

/// Body of `POST sessions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub repo: String,
    pub prompt: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub branch_name: String,
    #[serde(default)]
    pub autopr: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Ask the daemon to queue the work and return immediately.
    #[serde(rename = "async", default)]
    pub run_async: bool,
}

/// Body of `POST sessions/{id}/runs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub prompt: String,
    #[serde(rename = "async", default)]
    pub run_async: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_session_omits_default_tool() {
        let req = CreateSessionRequest {
            repo: "owner/repo".to_string(),
            prompt: "fix the flaky test".to_string(),
            run_async: true,
            ..CreateSessionRequest::default()
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["async"], true);
        assert_eq!(json["autopr"], false);
        assert!(json.get("tool").is_none());
    }

    #[test]
    fn create_run_uses_async_key() {
        let req = CreateRunRequest {
            prompt: "also update docs".to_string(),
            run_async: true,
        };
        let json = serde_json::to_string(&req).expect("serialize");
        assert_eq!(json, r#"{"prompt":"also update docs","async":true}"#);
    }
}
