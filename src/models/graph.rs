//! Graph Execution Models
//!
//! Request shapes for opening a graph execution stream.

use serde::{Deserialize, Serialize};

/// One prior exchange forwarded to the graph as conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleMessage {
    pub role: String,
    pub content: String,
}

impl SimpleMessage {
    /// History entry for a human turn
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: "human".to_string(),
            content: content.into(),
        }
    }

    /// History entry for an AI turn
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: "ai".to_string(),
            content: content.into(),
        }
    }
}

/// Optional execution tuning forwarded to the graph service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_general_knowledge_fallback: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_level: Option<String>,
}

impl ExecutionConfig {
    /// Whether any tuning field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of the stream-open request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphInput {
    pub user_query: String,
    pub profile_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<SimpleMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_config: Option<ExecutionConfig>,
}

/// A user submission as handed to the session controller
#[derive(Debug, Clone, Default)]
pub struct UserQueryRequest {
    pub query: String,
    pub process_override: Option<String>,
    pub model_selection: Option<String>,
}

impl UserQueryRequest {
    /// Request with just a query text
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Execution config assembled from the request overrides, `None` when
    /// nothing was overridden
    pub fn execution_config(&self) -> Option<ExecutionConfig> {
        let config = ExecutionConfig {
            process_override: self.process_override.clone(),
            model_selection: self.model_selection.clone(),
            ..ExecutionConfig::default()
        };
        if config.is_empty() {
            None
        } else {
            Some(config)
        }
    }
}
