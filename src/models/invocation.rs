//! Invocation Models
//!
//! Data structures for server-side graph invocations: the persisted
//! invocation record fetched from the backend and the typed status tags
//! decoded from it.

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Status of a graph invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// Invocation is executing on the backend
    Running,
    /// Invocation finished successfully
    Completed,
    /// Invocation was stopped by the user
    Stopped,
    /// Invocation failed
    Error,
}

impl Default for InvocationStatus {
    fn default() -> Self {
        Self::Running
    }
}

impl InvocationStatus {
    /// Decode a wire-level status tag.
    ///
    /// Unknown tags are rejected rather than mapped to a default so a
    /// backend drift shows up in logs instead of silently corrupting the
    /// session state machine.
    pub fn parse(tag: &str) -> AppResult<Self> {
        match tag {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "stopped" => Ok(Self::Stopped),
            "error" => Ok(Self::Error),
            other => Err(AppError::api(format!("Unknown invocation status: {other}"))),
        }
    }

    /// Whether no further transition can occur for this invocation
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }
}

/// One completed (or in-flight) node of a graph execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStep {
    /// Name of the graph node
    pub node: String,
    /// Optional human-readable detail for the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl GraphStep {
    /// Create a step with just a node name
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            detail: None,
        }
    }

    /// Attach detail text to the step
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// The execution-state object persisted alongside an invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStateSnapshot {
    /// Completed steps, in execution order
    #[serde(default)]
    pub steps: Vec<GraphStep>,
    /// Latest result text, final once the invocation completes
    #[serde(default)]
    pub current_result: Option<String>,
    /// Error text if the invocation failed
    #[serde(default)]
    pub error: Option<String>,
    /// Latest transient progress blurb
    #[serde(default)]
    pub blurb: Option<String>,
}

/// An invocation record as returned by the backend.
///
/// `status` is carried as the raw wire tag; callers go through
/// [`Invocation::status`] to obtain the closed enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    pub invocation_id: String,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub user_query: Option<String>,
    pub status: String,
    #[serde(default)]
    pub graph_state: Option<GraphStateSnapshot>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Invocation {
    /// Decode the status tag into the closed enum
    pub fn status(&self) -> AppResult<InvocationStatus> {
        InvocationStatus::parse(&self.status)
    }

    /// Steps from the graph state, empty if no state was recorded yet
    pub fn steps(&self) -> Vec<GraphStep> {
        self.graph_state
            .as_ref()
            .map(|state| state.steps.clone())
            .unwrap_or_default()
    }

    /// Current result text from the graph state
    pub fn current_result(&self) -> Option<String> {
        self.graph_state
            .as_ref()
            .and_then(|state| state.current_result.clone())
    }

    /// Error text from the graph state
    pub fn error(&self) -> Option<String> {
        self.graph_state
            .as_ref()
            .and_then(|state| state.error.clone())
    }

    /// Latest transient blurb from the graph state
    pub fn blurb(&self) -> Option<String> {
        self.graph_state
            .as_ref()
            .and_then(|state| state.blurb.clone())
    }
}
