//! Error types for the remote access layer and the sync engine

use thiserror::Error;

/// Errors raised by a [`RemoteApi`](crate::api::RemoteApi) implementation
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the response text, or `HTTP <code>`.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API endpoint not configured")]
    NotConfigured,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Errors surfaced by the application state and its actor
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Validation(String),

    #[error("Sync actor stopped")]
    ActorClosed,
}
