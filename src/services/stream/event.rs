//! Stream Event Types
//!
//! Decoded event records extracted from the execution stream, plus the
//! decode step from the wire JSON. Event tags form a closed set; unknown
//! tags are rejected by the decode so drift in the backend vocabulary is
//! logged instead of silently absorbed.

use serde::Deserialize;

/// Field prefix every frame must carry
const DATA_PREFIX: &str = "data:";

/// Wire shape of one frame payload
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    invocation_id: Option<String>,
    event_type: String,
    #[serde(default)]
    event_value: Option<serde_json::Value>,
}

/// A decoded event record
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Emitted once when the invocation starts; first carrier of the
    /// invocation id
    GraphStart,
    /// A graph node finished
    NodeComplete { node: Option<String> },
    /// Periodic keepalive while a node is still executing
    Heartbeat,
    /// The whole graph finished successfully
    GraphComplete,
    /// The invocation was stopped on the backend
    Stopped,
    /// The invocation failed
    Error { message: Option<String> },
    /// Transient display-only progress note
    Blurb { text: String },
}

/// One decoded frame: the event plus the invocation id it was tagged with
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFrame {
    pub invocation_id: Option<String>,
    pub event: StreamEvent,
}

/// Errors produced while decoding a single frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Fragment does not start with the `data:` field prefix
    MissingPrefix(String),
    /// Payload is not valid JSON of the expected shape
    Parse(String),
    /// Event tag is outside the known vocabulary
    UnknownEvent(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::MissingPrefix(fragment) => {
                write!(f, "Frame missing data prefix: {}", fragment)
            }
            FrameError::Parse(msg) => write!(f, "Frame parse error: {}", msg),
            FrameError::UnknownEvent(tag) => write!(f, "Unknown event type: {}", tag),
        }
    }
}

impl std::error::Error for FrameError {}

/// Decode one non-empty fragment into a frame.
pub(crate) fn decode_fragment(fragment: &str) -> Result<StreamFrame, FrameError> {
    let payload = fragment
        .strip_prefix(DATA_PREFIX)
        .ok_or_else(|| FrameError::MissingPrefix(preview(fragment)))?
        .trim();

    let wire: WireEvent =
        serde_json::from_str(payload).map_err(|e| FrameError::Parse(e.to_string()))?;

    let event = match wire.event_type.as_str() {
        "graph_start" => StreamEvent::GraphStart,
        "node_complete" => StreamEvent::NodeComplete {
            node: value_str(&wire.event_value, "node"),
        },
        "heartbeat" => StreamEvent::Heartbeat,
        "graph_complete" => StreamEvent::GraphComplete,
        "stopped" => StreamEvent::Stopped,
        "error" => StreamEvent::Error {
            message: value_str(&wire.event_value, "error"),
        },
        "blurb" => StreamEvent::Blurb {
            text: value_str(&wire.event_value, "blurb")
                .or_else(|| value_str(&wire.event_value, "text"))
                .ok_or_else(|| FrameError::Parse("blurb event missing text".to_string()))?,
        },
        other => return Err(FrameError::UnknownEvent(other.to_string())),
    };

    Ok(StreamFrame {
        invocation_id: wire.invocation_id,
        event,
    })
}

fn value_str(value: &Option<serde_json::Value>, key: &str) -> Option<String> {
    value
        .as_ref()
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn preview(fragment: &str) -> String {
    const MAX: usize = 60;
    let mut out: String = fragment.chars().take(MAX).collect();
    if fragment.chars().count() > MAX {
        out.push_str("...");
    }
    out
}
