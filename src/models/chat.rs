//! Chat View Models
//!
//! In-memory message representations held by the session state store.
//! These are rebuilt fully on conversation load and patched incrementally
//! while an invocation is active; they are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::invocation::{GraphStep, InvocationStatus};

/// Overall session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No invocation active, ready for a submission
    Idle,
    /// A conversation is being loaded
    Loading,
    /// An invocation is active (streaming or polling)
    Running,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// Role of a message in the transcript view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Ai,
}

/// Content of an AI message, reconciled from stream events and
/// authoritative invocation snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessageContent {
    /// Backend invocation id, unknown until the stream reveals it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    /// Current status; transitions only forward from `Running`
    pub status: InvocationStatus,
    /// Latest authoritative step list, wholesale-replaced on refresh
    #[serde(default)]
    pub steps: Vec<GraphStep>,
    /// Final answer text once available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
    /// Error text if the invocation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Display-only progress blurb; never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_blurb: Option<String>,
}

impl Default for AiMessageContent {
    fn default() -> Self {
        Self {
            invocation_id: None,
            status: InvocationStatus::Running,
            steps: Vec::new(),
            final_result: None,
            error_message: None,
            latest_blurb: None,
        }
    }
}

impl AiMessageContent {
    /// Content for a freshly created AI placeholder turn
    pub fn running() -> Self {
        Self::default()
    }

    /// Content representing a failed invocation load
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Error,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Message content: plain text for user messages, structured content for
/// AI messages. Matches the wire union the UI consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Ai(AiMessageContent),
}

/// One entry of the transcript view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageViewModel {
    /// Equals the persisted chat turn id
    pub id: String,
    pub role: MessageRole,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessageViewModel {
    /// Build a user message
    pub fn user(id: impl Into<String>, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
            timestamp,
        }
    }

    /// Build an AI message
    pub fn ai(id: impl Into<String>, content: AiMessageContent, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Ai,
            content: MessageContent::Ai(content),
            timestamp,
        }
    }

    /// AI content, if this is an AI message
    pub fn ai_content(&self) -> Option<&AiMessageContent> {
        match &self.content {
            MessageContent::Ai(content) => Some(content),
            MessageContent::Text(_) => None,
        }
    }

    /// Plain text content, if this is a user message
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Ai(_) => None,
        }
    }
}
