//! fogsync protocol
//!
//! Wire types exchanged with the fog daemon's HTTP API.
//! All bodies are JSON with snake_case field names.

pub mod client;
pub mod server;
pub mod types;

pub use client::{CreateRunRequest, CreateSessionRequest};
pub use server::{
    CreateRunResponse, CreateSessionResponse, SessionDetail, STREAM_DONE_EVENT,
    STREAM_ERROR_EVENT,
};
pub use types::*;
