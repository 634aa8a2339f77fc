//! Test Support
//!
//! A scripted in-memory backend implementing all collaborator interfaces.
//! Turns are accumulated into a held conversation so a session round-trip
//! (submit, clear, reload) sees what it persisted; the execution stream
//! replays configured chunks and can be made to hang for cancellation
//! tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use deep_research_client::models::{
    ChatTurn, Conversation, GraphInput, GraphStateSnapshot, GraphStep, Invocation, TurnPatch,
    TurnPayload, TurnRole,
};
use deep_research_client::services::backend::{
    ChunkStream, GraphTransport, InvocationClient, TurnStore,
};
use deep_research_client::{AppError, AppResult};

/// Scripted backend for session tests
#[derive(Default)]
pub struct MockBackend {
    /// Conversation returned by the with-turns fetch; created turns are
    /// appended here
    pub conversation: Mutex<Option<Conversation>>,
    pub conversation_list: Mutex<Vec<Conversation>>,
    /// Every turn ever created
    pub turns_created: Mutex<Vec<ChatTurn>>,
    /// Every turn patch ever applied, with its target turn id
    pub turn_updates: Mutex<Vec<(String, TurnPatch)>>,
    /// Snapshot served by fetch_invocation
    pub invocation: Mutex<Option<Invocation>>,
    pub invocation_fetches: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub streams_opened: AtomicUsize,
    /// Chunks replayed by the next opened stream
    pub stream_chunks: Mutex<Vec<Bytes>>,
    /// Keep the stream open (pending) after the chunks are exhausted
    pub hang_after_chunks: AtomicBool,
    /// Fail the stream with a transport error after the chunks
    pub stream_error: Mutex<Option<String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Format one `data:` frame for the stream
    pub fn frame(json: &str) -> Bytes {
        Bytes::from(format!("data: {}\n\n", json))
    }

    pub fn push_frame(&self, json: &str) {
        self.stream_chunks.lock().unwrap().push(Self::frame(json));
    }

    pub fn push_chunk(&self, chunk: impl Into<Bytes>) {
        self.stream_chunks.lock().unwrap().push(chunk.into());
    }

    /// Install the snapshot served for any invocation id
    pub fn set_invocation(&self, status: &str, steps: Vec<GraphStep>, result: Option<&str>) {
        *self.invocation.lock().unwrap() = Some(Invocation {
            invocation_id: "inv-1".to_string(),
            profile_id: Some("p-1".to_string()),
            user_query: None,
            status: status.to_string(),
            graph_state: Some(GraphStateSnapshot {
                steps,
                current_result: result.map(str::to_string),
                error: None,
                blurb: None,
            }),
            created_at: None,
            updated_at: None,
        });
    }

    /// Seed a persisted conversation the session can load
    pub fn seed_conversation(&self, turns: Vec<ChatTurn>) -> String {
        let conversation = Conversation {
            id: "c-1".to_string(),
            profile_id: "p-1".to_string(),
            title: Some("seeded".to_string()),
            created_at: None,
            updated_at: None,
            chat_turns: turns,
        };
        let id = conversation.id.clone();
        *self.conversation.lock().unwrap() = Some(conversation);
        id
    }

    pub fn human_turn(id: &str, content: &str) -> ChatTurn {
        ChatTurn {
            id: id.to_string(),
            role: TurnRole::Human,
            data: TurnPayload::text(content),
            timestamp: "2025-06-01T10:00:00+00:00".to_string(),
        }
    }

    pub fn ai_turn(id: &str, invocation_id: Option<&str>) -> ChatTurn {
        let mut data = TurnPayload::empty();
        data.invocation_id = invocation_id.map(str::to_string);
        ChatTurn {
            id: id.to_string(),
            role: TurnRole::Ai,
            data,
            timestamp: "2025-06-01T10:00:05+00:00".to_string(),
        }
    }

    /// Number of turn patches that carried an invocation id
    pub fn invocation_persists(&self) -> usize {
        self.turn_updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, patch)| patch.invocation_id.is_some())
            .count()
    }
}

#[async_trait]
impl TurnStore for MockBackend {
    async fn create_conversation(&self, profile_id: &str, title: &str) -> AppResult<Conversation> {
        let conversation = Conversation {
            id: format!("c-{}", Uuid::new_v4()),
            profile_id: profile_id.to_string(),
            title: Some(title.to_string()),
            created_at: None,
            updated_at: None,
            chat_turns: Vec::new(),
        };
        *self.conversation.lock().unwrap() = Some(conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(&self, _profile_id: &str) -> AppResult<Vec<Conversation>> {
        Ok(self.conversation_list.lock().unwrap().clone())
    }

    async fn fetch_conversation_with_turns(
        &self,
        _profile_id: &str,
        _conversation_id: &str,
    ) -> AppResult<Option<Conversation>> {
        Ok(self.conversation.lock().unwrap().clone())
    }

    async fn create_turn(
        &self,
        _profile_id: &str,
        _conversation_id: &str,
        role: TurnRole,
        payload: TurnPayload,
        timestamp: &str,
    ) -> AppResult<ChatTurn> {
        let turn = ChatTurn {
            id: format!("t-{}", Uuid::new_v4()),
            role,
            data: payload,
            timestamp: timestamp.to_string(),
        };
        self.turns_created.lock().unwrap().push(turn.clone());
        if let Some(conversation) = self.conversation.lock().unwrap().as_mut() {
            conversation.chat_turns.push(turn.clone());
        }
        Ok(turn)
    }

    async fn update_turn(
        &self,
        _profile_id: &str,
        turn_id: &str,
        patch: TurnPatch,
    ) -> AppResult<ChatTurn> {
        self.turn_updates
            .lock()
            .unwrap()
            .push((turn_id.to_string(), patch.clone()));

        let mut conversation = self.conversation.lock().unwrap();
        if let Some(conversation) = conversation.as_mut() {
            if let Some(turn) = conversation.chat_turns.iter_mut().find(|t| t.id == turn_id) {
                if let Some(invocation_id) = patch.invocation_id.clone() {
                    turn.data.invocation_id = Some(invocation_id);
                }
                return Ok(turn.clone());
            }
        }

        let turns = self.turns_created.lock().unwrap();
        turns
            .iter()
            .find(|t| t.id == turn_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Turn {}", turn_id)))
    }
}

#[async_trait]
impl InvocationClient for MockBackend {
    async fn fetch_invocation(
        &self,
        _profile_id: &str,
        invocation_id: &str,
    ) -> AppResult<Invocation> {
        self.invocation_fetches.fetch_add(1, Ordering::SeqCst);
        self.invocation
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::not_found(format!("Invocation {}", invocation_id)))
    }

    async fn stop_invocation(&self, _profile_id: &str, _invocation_id: &str) -> AppResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl GraphTransport for MockBackend {
    async fn open_stream(
        &self,
        _input: &GraphInput,
        cancel: CancellationToken,
    ) -> AppResult<ChunkStream> {
        self.streams_opened.fetch_add(1, Ordering::SeqCst);

        let mut chunks: Vec<AppResult<Bytes>> = self
            .stream_chunks
            .lock()
            .unwrap()
            .clone()
            .into_iter()
            .map(Ok)
            .collect();
        if let Some(message) = self.stream_error.lock().unwrap().clone() {
            chunks.push(Err(AppError::transport(message)));
        }

        let replay = stream::iter(chunks);
        let stream: ChunkStream = if self.hang_after_chunks.load(Ordering::SeqCst) {
            replay
                .chain(stream::pending())
                .take_until(Box::pin(cancel.cancelled_owned()))
                .boxed()
        } else {
            replay.boxed()
        };
        Ok(stream)
    }
}
