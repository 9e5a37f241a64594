//! fogsync
//!
//! Keeps a local, consistent view of a fog daemon's sessions, runs and run
//! events: periodic directory polling, session detail loading, and a live
//! event stream for the selected run while it is active.

pub mod api;
pub mod app_actor;
pub mod app_command;
pub mod config;
pub mod detail;
pub mod directory;
pub mod error;
pub mod host;
pub mod http;
pub mod links;
pub mod logging;
pub mod paths;
pub mod selection;
pub mod snapshot;
pub mod sse;
pub mod state;
pub mod stream;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{Endpoint, RemoteApi, RunEventStream, StreamFrame};
pub use app_actor::SyncHandle;
pub use config::SyncConfig;
pub use detail::{DetailState, DetailStatus};
pub use error::{ApiError, SyncError};
pub use host::{DefaultHost, HostBridge, SystemHost};
pub use http::HttpApi;
pub use links::{LinkKind, SessionLinks};
pub use selection::{Selection, View};
pub use snapshot::{AppSnapshot, ConnectionStatus, StreamCloseReason, SyncNotice};
pub use state::AppState;
pub use stream::{Signal, StreamKey};
pub use timeline::Timeline;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
