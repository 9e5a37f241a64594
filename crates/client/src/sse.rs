//! Incremental decoder for `text/event-stream` bodies.

use bytes::{Buf, BytesMut};
use fogsync_protocol::{RunEvent, STREAM_DONE_EVENT, STREAM_ERROR_EVENT};
use tracing::warn;

use crate::api::StreamFrame;
use crate::error::ApiError;

/// One dispatched server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Accumulates body chunks and yields complete frames.
///
/// Chunks may split lines and frames anywhere; partial input stays buffered
/// until the terminating blank line arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw = self.buf.split_to(pos);
            self.buf.advance(1);
            let raw = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
            let line = String::from_utf8_lossy(raw);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Bytes still waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let frame = SseFrame {
            event: self.event.take(),
            data: self.data.join("\n"),
            id: self.id.take(),
        };
        self.data.clear();
        Some(frame)
    }
}

/// Interpret an SSE frame as a run stream frame.
///
/// `None` means the frame carries nothing for the timeline (keep-alives,
/// malformed payloads).
pub fn into_stream_frame(frame: SseFrame) -> Option<Result<StreamFrame, ApiError>> {
    match frame.event.as_deref() {
        Some(STREAM_DONE_EVENT) => Some(Ok(StreamFrame::Done)),
        Some(STREAM_ERROR_EVENT) => {
            let message = if frame.data.trim().is_empty() {
                "stream error".to_string()
            } else {
                frame.data
            };
            Some(Err(ApiError::Stream(message)))
        }
        _ => {
            if frame.data.trim().is_empty() {
                return None;
            }
            match serde_json::from_str::<RunEvent>(&frame.data) {
                Ok(event) => Some(Ok(StreamFrame::Event(event))),
                Err(e) => {
                    warn!(
                        component = "sse",
                        event = "sse.frame.parse_failed",
                        error = %e,
                        payload_bytes = frame.data.len(),
                        "Dropping malformed run event frame"
                    );
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"id\":1,").is_empty());
        assert!(decoder.push(b"\"type\":\"setup\"}\n").is_empty());
        let frames = decoder.push(b"\ndata: {\"id\":2}\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, r#"{"id":1,"type":"setup"}"#);
        assert_eq!(frames[1].data, r#"{"id":2}"#);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn crlf_comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\r\n\r\nid: 7\r\ndata: line one\r\ndata: line two\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "line one\nline two".to_string(),
                id: Some("7".to_string()),
            }]
        );
    }

    #[test]
    fn done_event_without_data_dispatches() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: done\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(
            into_stream_frame(frames[0].clone()).map(|r| r.ok()),
            Some(Some(StreamFrame::Done))
        );
    }

    #[test]
    fn maps_events_errors_and_noise() {
        let event = into_stream_frame(SseFrame {
            event: Some("message".to_string()),
            data: r#"{"id":5,"run_id":"r1","type":"ai_start","message":"Running AI tool"}"#
                .to_string(),
            id: None,
        });
        match event {
            Some(Ok(StreamFrame::Event(ev))) => {
                assert_eq!(ev.id, 5);
                assert_eq!(ev.event_type, "ai_start");
            }
            other => panic!("expected event frame, got {:?}", other),
        }

        let err = into_stream_frame(SseFrame {
            event: Some("error".to_string()),
            data: "run not found".to_string(),
            id: None,
        });
        assert!(matches!(err, Some(Err(ApiError::Stream(ref m))) if m == "run not found"));

        let garbage = into_stream_frame(SseFrame {
            event: None,
            data: "not json".to_string(),
            id: None,
        });
        assert!(garbage.is_none());
    }
}
