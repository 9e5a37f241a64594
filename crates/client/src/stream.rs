//! Event stream controller. Owns at most one live run stream.
//!
//! Each connection runs as a reader task that forwards frames to the owner
//! as [`Signal::Stream`] messages tagged with a generation number. Closing
//! aborts the reader and retires the generation, so anything the old
//! connection already queued is ignored by [`EventStreamController::accepts`].

use std::sync::Arc;

use futures::StreamExt;
use fogsync_protocol::RunEvent;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::{RemoteApi, StreamFrame};

/// Identity of a live connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StreamKey {
    pub session_id: String,
    pub run_id: String,
}

impl StreamKey {
    pub fn new(session_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            run_id: run_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignalKind {
    Event(RunEvent),
    Done,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSignal {
    pub generation: u64,
    pub key: StreamKey,
    pub kind: StreamSignalKind,
}

/// Everything that wakes the application state besides explicit commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Polling timer fired.
    Tick,
    Stream(StreamSignal),
}

struct ActiveStream {
    key: StreamKey,
    generation: u64,
    task: JoinHandle<()>,
}

pub struct EventStreamController {
    api: Arc<dyn RemoteApi>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    active: Option<ActiveStream>,
    generation: u64,
}

impl EventStreamController {
    pub fn new(api: Arc<dyn RemoteApi>, signal_tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self {
            api,
            signal_tx,
            active: None,
            generation: 0,
        }
    }

    pub fn key(&self) -> Option<&StreamKey> {
        self.active.as_ref().map(|a| &a.key)
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Open a connection for `key`, resuming after `cursor`.
    ///
    /// No-op (returns false) when a connection for the same key is already
    /// open. Any connection for another key is closed first.
    pub fn open(&mut self, key: StreamKey, cursor: u64) -> bool {
        if self.key() == Some(&key) {
            return false;
        }
        self.close();

        self.generation += 1;
        let generation = self.generation;
        let task = tokio::spawn(pump(
            self.api.clone(),
            key.clone(),
            cursor,
            generation,
            self.signal_tx.clone(),
        ));
        info!(
            component = "stream",
            event = "stream.opened",
            session_id = %key.session_id,
            run_id = %key.run_id,
            cursor,
            generation,
            "Run stream opened"
        );
        self.active = Some(ActiveStream {
            key,
            generation,
            task,
        });
        true
    }

    /// Close the live connection, if any. Returns the key that was closed.
    pub fn close(&mut self) -> Option<StreamKey> {
        let active = self.active.take()?;
        active.task.abort();
        info!(
            component = "stream",
            event = "stream.closed",
            session_id = %active.key.session_id,
            run_id = %active.key.run_id,
            generation = active.generation,
            "Run stream closed"
        );
        Some(active.key)
    }

    /// Whether `signal` comes from the connection that is currently open.
    pub fn accepts(&self, signal: &StreamSignal) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.generation == signal.generation && a.key == signal.key)
    }
}

impl Drop for EventStreamController {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

/// Reader task: connect, then forward frames until done, error or abort.
async fn pump(
    api: Arc<dyn RemoteApi>,
    key: StreamKey,
    cursor: u64,
    generation: u64,
    signal_tx: mpsc::UnboundedSender<Signal>,
) {
    let send = |kind: StreamSignalKind| {
        signal_tx
            .send(Signal::Stream(StreamSignal {
                generation,
                key: key.clone(),
                kind,
            }))
            .is_ok()
    };

    let mut frames = match api
        .open_run_stream(&key.session_id, &key.run_id, cursor)
        .await
    {
        Ok(frames) => frames,
        Err(e) => {
            send(StreamSignalKind::Error(e.to_string()));
            return;
        }
    };

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(StreamFrame::Event(event)) => {
                if !send(StreamSignalKind::Event(event)) {
                    debug!(
                        component = "stream",
                        event = "stream.owner_gone",
                        generation,
                        "Signal channel closed, stopping reader"
                    );
                    return;
                }
            }
            Ok(StreamFrame::Done) => {
                send(StreamSignalKind::Done);
                return;
            }
            Err(e) => {
                send(StreamSignalKind::Error(e.to_string()));
                return;
            }
        }
    }

    send(StreamSignalKind::Error("stream ended".to_string()));
}
