//! Conversation Models
//!
//! Persisted conversation, chat turn, and profile records owned by the
//! backend database service. This core only ever writes one turn field
//! after creation: the `invocation_id` linking an AI turn to its graph
//! invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a persisted chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Human,
    Ai,
}

/// Opaque turn payload.
///
/// Human turns carry `content`; AI turns start empty and may gain an
/// `invocation_id`. Any other backend-owned fields are preserved verbatim
/// in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TurnPayload {
    /// Payload for a human turn
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Empty payload for a freshly created AI turn
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Partial turn update, applied with PATCH semantics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
}

impl TurnPatch {
    /// Patch that attaches an invocation id to a turn
    pub fn invocation(invocation_id: impl Into<String>) -> Self {
        Self {
            invocation_id: Some(invocation_id.into()),
        }
    }
}

/// A persisted chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub role: TurnRole,
    #[serde(default)]
    pub data: TurnPayload,
    /// Creation timestamp (RFC 3339)
    pub timestamp: String,
}

impl ChatTurn {
    /// Parse the turn timestamp, falling back to now for unparseable values
    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

/// A persisted conversation.
///
/// `chat_turns` is populated only by the with-turns fetch; listings return
/// it empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub profile_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub chat_turns: Vec<ChatTurn>,
}

/// A backend profile (tenant/workspace)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}
