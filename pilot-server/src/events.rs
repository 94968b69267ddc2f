//! Events streamed to clients as `data: {"type": ..., "content": ...}`.
use axum::response::sse::Event;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Capacity of the `/browser-events` fan-out. Slow subscribers skip ahead.
pub const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Keepalive,
    BrowserAction,
    DomUpdate,
    Error,
    FinalResponse,
    Complete,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub content: Value,
}

impl StreamEvent {
    pub fn new(kind: EventKind, content: Value) -> Self {
        Self { kind, content }
    }

    pub fn keepalive(message: &str) -> Self {
        Self::new(EventKind::Keepalive, json!(message))
    }

    /// Step lines go out as one-element arrays.
    pub fn browser_action(line: impl Into<String>) -> Self {
        Self::new(EventKind::BrowserAction, json!([line.into()]))
    }

    pub fn dom_update(line: impl Into<String>) -> Self {
        Self::new(EventKind::DomUpdate, json!([line.into()]))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, json!(message.into()))
    }

    pub fn final_response(content: Value) -> Self {
        Self::new(EventKind::FinalResponse, content)
    }

    pub fn complete() -> Self {
        Self::new(EventKind::Complete, json!("Processing completed"))
    }

    pub fn end() -> Self {
        Self::new(EventKind::End, json!("Stream completed"))
    }

    /// `complete` and `end` close a query stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Complete | EventKind::End)
    }

    pub fn to_sse(&self) -> Event {
        match serde_json::to_string(self) {
            Ok(data) => Event::default().data(data),
            Err(_) => Event::default().data(r#"{"type":"error","content":"unserializable event"}"#),
        }
    }
}

/// Fan-out of browser activity to every `/browser-events` subscriber.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StreamEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }
}
