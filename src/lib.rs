//! Deep Research Client - Session Core Library
//!
//! Client-side core for conversing with the Deep Research graph execution
//! backend. It includes:
//! - The chat session controller (submission, streaming, polling fallback,
//!   cancellation)
//! - The ordered message store that is the single source of UI truth
//! - The execution stream frame parser
//! - Collaborator interfaces plus their reqwest reference implementation
//! - Preference storage and data models

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export the main session surface
pub use services::{
    ChatSession, FrameParser, GraphTransport, HttpBackend, InvocationClient, InvocationPoller,
    MessageStore, StreamEvent, StreamFrame, TurnStore,
};
// Re-export commonly used models
pub use models::{
    AiMessageContent, ChatMessageViewModel, ChatTurn, Conversation, GraphInput, GraphStep,
    InvocationStatus, MessageContent, MessageRole, SessionStatus, UserQueryRequest,
};
pub use storage::PreferencesService;
pub use utils::error::{AppError, AppResult};
