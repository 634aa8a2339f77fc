//! Collaborator Interfaces
//!
//! Transport-agnostic contracts for the external services the session core
//! consumes: the turn/conversation store, the invocation read/stop API, and
//! the graph execution stream. The session controller only ever talks to
//! these traits; [`crate::services::http::HttpBackend`] is the reference
//! implementation.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::models::conversation::{ChatTurn, Conversation, TurnPatch, TurnPayload, TurnRole};
use crate::models::graph::GraphInput;
use crate::models::invocation::Invocation;
use crate::utils::error::AppResult;

/// Raw chunk stream of an open graph execution
pub type ChunkStream = BoxStream<'static, AppResult<Bytes>>;

/// Persisted conversation and turn storage
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Create a conversation under a profile
    async fn create_conversation(&self, profile_id: &str, title: &str) -> AppResult<Conversation>;

    /// List conversations for a profile, without turns
    async fn list_conversations(&self, profile_id: &str) -> AppResult<Vec<Conversation>>;

    /// Fetch a conversation including its turns; `None` if it doesn't exist
    async fn fetch_conversation_with_turns(
        &self,
        profile_id: &str,
        conversation_id: &str,
    ) -> AppResult<Option<Conversation>>;

    /// Create a turn in a conversation
    async fn create_turn(
        &self,
        profile_id: &str,
        conversation_id: &str,
        role: TurnRole,
        payload: TurnPayload,
        timestamp: &str,
    ) -> AppResult<ChatTurn>;

    /// Apply a partial update to a turn
    async fn update_turn(
        &self,
        profile_id: &str,
        turn_id: &str,
        patch: TurnPatch,
    ) -> AppResult<ChatTurn>;
}

/// Authoritative invocation state: on-demand snapshots and the stop call
#[async_trait]
pub trait InvocationClient: Send + Sync {
    /// Fetch the authoritative state of an invocation
    async fn fetch_invocation(
        &self,
        profile_id: &str,
        invocation_id: &str,
    ) -> AppResult<Invocation>;

    /// Request the backend to stop an invocation
    async fn stop_invocation(&self, profile_id: &str, invocation_id: &str) -> AppResult<()>;
}

/// Live execution stream transport
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Open an execution stream for a submission.
    ///
    /// Cancelling the token aborts the transport; the returned stream then
    /// ends instead of yielding further chunks.
    async fn open_stream(
        &self,
        input: &GraphInput,
        cancel: CancellationToken,
    ) -> AppResult<ChunkStream>;
}
