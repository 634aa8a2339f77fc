//! Chat Session Controller
//!
//! Drives one conversational turn from submission to terminal state:
//! creates the human and AI placeholder turns, consumes the live execution
//! stream, reconciles stream events with authoritative invocation
//! snapshots, and hands over to the polling scheduler when a conversation
//! is reloaded mid-invocation. User-initiated cancellation can interrupt
//! either path at any time.
//!
//! The session owns the single active-invocation slot (invocation id,
//! cancellation token, poll timer); every state mutation flows through the
//! message store so hosts observe one consistent view.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::models::chat::{
    AiMessageContent, ChatMessageViewModel, MessageContent, SessionStatus,
};
use crate::models::conversation::{ChatTurn, Conversation, TurnPatch, TurnPayload, TurnRole};
use crate::models::graph::{GraphInput, SimpleMessage, UserQueryRequest};
use crate::models::invocation::{GraphStep, InvocationStatus};
use crate::services::backend::{GraphTransport, InvocationClient, TurnStore};
use crate::services::http::HttpBackend;
use crate::services::polling::{InvocationPoller, INVOCATION_POLL_INTERVAL};
use crate::services::store::MessageStore;
use crate::services::stream::{FrameParser, StreamEvent, StreamFrame};
use crate::utils::error::{AppError, AppResult};

/// Conversation titles are cut from the first message at this length
const TITLE_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveMode {
    /// A live execution stream is being consumed
    Streaming,
    /// A resumed invocation is tracked by the poller
    Polling,
}

/// The single active-invocation slot
struct ActiveInvocation {
    message_id: String,
    profile_id: String,
    invocation_id: Option<String>,
    cancel: CancellationToken,
    stop_requested: bool,
    mode: ActiveMode,
}

struct CurrentConversation {
    id: String,
    profile_id: String,
}

/// Local accumulator for the AI turn driven by one stream
struct TurnProgress {
    message_id: String,
    invocation_id: Option<String>,
    /// Whether the invocation id has been persisted onto the turn
    persisted: bool,
    status: InvocationStatus,
    steps: Vec<GraphStep>,
    final_result: Option<String>,
    error_message: Option<String>,
    latest_blurb: Option<String>,
}

impl TurnProgress {
    fn new(message_id: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            invocation_id: None,
            persisted: false,
            status: InvocationStatus::Running,
            steps: Vec::new(),
            final_result: None,
            error_message: None,
            latest_blurb: None,
        }
    }

    fn content(&self) -> AiMessageContent {
        AiMessageContent {
            invocation_id: self.invocation_id.clone(),
            status: self.status,
            steps: self.steps.clone(),
            final_result: self.final_result.clone(),
            error_message: self.error_message.clone(),
            latest_blurb: self.latest_blurb.clone(),
        }
    }
}

/// One chat session against the graph execution backend
pub struct ChatSession {
    store: Arc<MessageStore>,
    turns: Arc<dyn TurnStore>,
    invocations: Arc<dyn InvocationClient>,
    transport: Arc<dyn GraphTransport>,
    poller: InvocationPoller,
    status_tx: Arc<watch::Sender<SessionStatus>>,
    status_rx: watch::Receiver<SessionStatus>,
    conversations: RwLock<Vec<Conversation>>,
    current: RwLock<Option<CurrentConversation>>,
    error: RwLock<Option<String>>,
    active: Mutex<Option<ActiveInvocation>>,
}

impl ChatSession {
    /// Create a session over the given collaborators
    pub fn new(
        turns: Arc<dyn TurnStore>,
        invocations: Arc<dyn InvocationClient>,
        transport: Arc<dyn GraphTransport>,
    ) -> Self {
        Self::with_poll_interval(turns, invocations, transport, INVOCATION_POLL_INTERVAL)
    }

    /// Create a session with a custom poll interval
    pub fn with_poll_interval(
        turns: Arc<dyn TurnStore>,
        invocations: Arc<dyn InvocationClient>,
        transport: Arc<dyn GraphTransport>,
        poll_interval: Duration,
    ) -> Self {
        let store = MessageStore::new();
        let (status_tx, status_rx) = watch::channel(SessionStatus::Idle);
        let poller =
            InvocationPoller::with_interval(store.clone(), invocations.clone(), poll_interval);
        Self {
            store,
            turns,
            invocations,
            transport,
            poller,
            status_tx: Arc::new(status_tx),
            status_rx,
            conversations: RwLock::new(Vec::new()),
            current: RwLock::new(None),
            error: RwLock::new(None),
            active: Mutex::new(None),
        }
    }

    /// Create a session backed by the HTTP backend for all collaborators
    pub fn with_http(backend: HttpBackend) -> Self {
        let backend = Arc::new(backend);
        Self::new(backend.clone(), backend.clone(), backend)
    }

    /// The message store backing this session
    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    /// Current session status
    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to session status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Last surfaced user-visible error, if any
    pub async fn last_error(&self) -> Option<String> {
        self.error.read().await.clone()
    }

    /// Surface a user-visible error message
    pub async fn set_error(&self, message: impl Into<String>) {
        *self.error.write().await = Some(message.into());
    }

    /// Cached conversation listing
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().await.clone()
    }

    /// Id of the currently loaded conversation
    pub async fn current_conversation_id(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|c| c.id.clone())
    }

    /// Whether the polling fallback is currently tracking an invocation
    pub async fn is_polling(&self) -> bool {
        self.poller.is_active().await
    }

    /// Refresh the conversation listing for a profile.
    ///
    /// Failures degrade to an empty listing; they never disturb the
    /// session state machine.
    pub async fn load_conversations(&self, profile_id: &str) {
        if profile_id.is_empty() {
            self.conversations.write().await.clear();
            return;
        }
        match self.turns.list_conversations(profile_id).await {
            Ok(conversations) => *self.conversations.write().await = conversations,
            Err(err) => {
                tracing::warn!("[ChatSession] Failed to fetch conversations: {}", err);
                self.conversations.write().await.clear();
            }
        }
    }

    /// Create a conversation titled after the first message and make it
    /// current.
    pub async fn create_conversation(
        &self,
        profile_id: &str,
        first_message: &str,
    ) -> AppResult<String> {
        let title = conversation_title(first_message);
        tracing::debug!("[ChatSession] Creating conversation with title: {}", title);

        match self.turns.create_conversation(profile_id, &title).await {
            Ok(conversation) => {
                let mut current = self.current.write().await;
                *current = Some(CurrentConversation {
                    id: conversation.id.clone(),
                    profile_id: profile_id.to_string(),
                });
                Ok(conversation.id)
            }
            Err(err) => {
                tracing::error!("[ChatSession] Error creating conversation: {}", err);
                self.set_error(err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Submit a user query and drive the resulting invocation to a
    /// terminal state.
    ///
    /// Creates the human turn and the AI placeholder turn, then consumes
    /// the execution stream until the transport closes or the user stops
    /// the invocation. Returns once the session is back at idle.
    ///
    /// A submission while another invocation is active is rejected; stop
    /// the active invocation first.
    pub async fn submit(&self, profile_id: &str, request: UserQueryRequest) -> AppResult<()> {
        if request.query.trim().is_empty() {
            tracing::warn!("[ChatSession] Empty message submitted");
            let err = AppError::validation("Please enter a message");
            self.set_error(err.to_string()).await;
            return Err(err);
        }

        // Atomically claim the running state; one invocation per session
        let mut claimed = false;
        self.status_tx.send_if_modified(|status| {
            if *status == SessionStatus::Idle {
                *status = SessionStatus::Running;
                claimed = true;
                true
            } else {
                false
            }
        });
        if !claimed {
            let err = AppError::validation("An invocation is already running");
            self.set_error(err.to_string()).await;
            return Err(err);
        }

        *self.error.write().await = None;

        // A poller that stopped on its own can leave a stale slot behind;
        // release it before installing ours.
        self.release_active().await;

        let conversation_id = match self.current_conversation_id().await {
            Some(id) => id,
            None => {
                tracing::debug!("[ChatSession] No active conversation, creating a new one");
                match self.create_conversation(profile_id, &request.query).await {
                    Ok(id) => {
                        self.load_conversations(profile_id).await;
                        id
                    }
                    Err(err) => {
                        self.fail_submission().await;
                        return Err(err);
                    }
                }
            }
        };

        // History reflects the transcript as it stood before this
        // submission.
        let history = self.chat_history().await;

        let user_timestamp = Utc::now().to_rfc3339();
        let user_turn = match self
            .turns
            .create_turn(
                profile_id,
                &conversation_id,
                TurnRole::Human,
                TurnPayload::text(request.query.clone()),
                &user_timestamp,
            )
            .await
        {
            Ok(turn) => turn,
            Err(err) => {
                tracing::error!("[ChatSession] Error creating user chat turn: {}", err);
                self.set_error(err.to_string()).await;
                self.fail_submission().await;
                return Err(err);
            }
        };
        self.store
            .upsert(ChatMessageViewModel::user(
                user_turn.id.clone(),
                user_turn.data.content.clone().unwrap_or_default(),
                user_turn.timestamp_utc(),
            ))
            .await;

        let ai_timestamp = Utc::now().to_rfc3339();
        let ai_turn = match self
            .turns
            .create_turn(
                profile_id,
                &conversation_id,
                TurnRole::Ai,
                TurnPayload::empty(),
                &ai_timestamp,
            )
            .await
        {
            Ok(turn) => turn,
            Err(err) => {
                tracing::error!("[ChatSession] Error creating AI chat turn: {}", err);
                self.set_error(err.to_string()).await;
                self.fail_submission().await;
                return Err(err);
            }
        };
        self.store
            .upsert(ChatMessageViewModel::ai(
                ai_turn.id.clone(),
                AiMessageContent::running(),
                ai_turn.timestamp_utc(),
            ))
            .await;

        let cancel = CancellationToken::new();
        {
            let mut active = self.active.lock().await;
            *active = Some(ActiveInvocation {
                message_id: ai_turn.id.clone(),
                profile_id: profile_id.to_string(),
                invocation_id: None,
                cancel: cancel.clone(),
                stop_requested: false,
                mode: ActiveMode::Streaming,
            });
        }

        let input = GraphInput {
            user_query: request.query.clone(),
            profile_id: profile_id.to_string(),
            messages: history,
            execution_config: request.execution_config(),
        };

        let result = self.run_stream(profile_id, &ai_turn.id, &input, cancel).await;
        self.finish_invocation(&ai_turn.id).await;
        result
    }

    /// Load a conversation, rebuilding the transcript from persisted turns
    /// plus one snapshot fetch per AI turn.
    ///
    /// If the newest AI turn is still running and its invocation id is
    /// known, the session re-enters the polling state for it (a stream
    /// cannot be resumed; only polling can).
    pub async fn load_conversation(
        &self,
        conversation_id: &str,
        profile_id: &str,
    ) -> AppResult<()> {
        self.release_active().await;
        self.status_tx.send_replace(SessionStatus::Loading);
        *self.error.write().await = None;

        let conversation = match self
            .turns
            .fetch_conversation_with_turns(profile_id, conversation_id)
            .await
        {
            Ok(conversation) => conversation,
            Err(err) => {
                tracing::error!("[ChatSession] Error loading conversation: {}", err);
                self.set_error(err.to_string()).await;
                self.reset_transcript().await;
                self.status_tx.send_replace(SessionStatus::Idle);
                return Err(err);
            }
        };

        let Some(conversation) = conversation else {
            tracing::warn!("[ChatSession] Conversation not found");
            self.set_error("Conversation not found").await;
            self.reset_transcript().await;
            self.status_tx.send_replace(SessionStatus::Idle);
            return Err(AppError::not_found(format!(
                "Conversation {}",
                conversation_id
            )));
        };

        {
            let mut current = self.current.write().await;
            *current = Some(CurrentConversation {
                id: conversation.id.clone(),
                profile_id: profile_id.to_string(),
            });
        }

        self.store.clear().await;
        for turn in &conversation.chat_turns {
            let message = match turn.role {
                TurnRole::Human => ChatMessageViewModel::user(
                    turn.id.clone(),
                    turn.data.content.clone().unwrap_or_default(),
                    turn.timestamp_utc(),
                ),
                TurnRole::Ai => {
                    let content = self.load_ai_content(profile_id, turn).await;
                    ChatMessageViewModel::ai(turn.id.clone(), content, turn.timestamp_utc())
                }
            };
            self.store.upsert(message).await;
        }

        // Resume tracking when the newest AI turn is still running
        if let Some(last) = self.store.last().await {
            if let Some(content) = last.ai_content() {
                if content.status == InvocationStatus::Running {
                    match content.invocation_id.clone() {
                        Some(invocation_id) => {
                            {
                                let mut active = self.active.lock().await;
                                *active = Some(ActiveInvocation {
                                    message_id: last.id.clone(),
                                    profile_id: profile_id.to_string(),
                                    invocation_id: Some(invocation_id.clone()),
                                    cancel: CancellationToken::new(),
                                    stop_requested: false,
                                    mode: ActiveMode::Polling,
                                });
                            }
                            self.status_tx.send_replace(SessionStatus::Running);
                            self.poller
                                .start(profile_id, &invocation_id, &last.id, self.status_tx.clone())
                                .await;
                            return Ok(());
                        }
                        None => {
                            tracing::warn!(
                                "[ChatSession] Last AI turn is running but carries no invocation id; cannot resume"
                            );
                        }
                    }
                }
            }
        }

        self.status_tx.send_replace(SessionStatus::Idle);
        Ok(())
    }

    /// Stop the active invocation.
    ///
    /// The local AI turn is finalized to `stopped` immediately, without
    /// waiting for backend confirmation; the backend stop call is best
    /// effort. A no-op when nothing is active, and idempotent: a second
    /// call never issues another backend stop.
    pub async fn stop(&self) {
        let (invocation_id, profile_id, message_id, polling) = {
            let mut active = self.active.lock().await;
            let Some(slot) = active.as_mut() else {
                return;
            };
            if slot.stop_requested {
                return;
            }
            slot.stop_requested = true;
            slot.cancel.cancel();
            let info = (
                slot.invocation_id.clone(),
                slot.profile_id.clone(),
                slot.message_id.clone(),
                slot.mode == ActiveMode::Polling,
            );
            // No stream loop owns a polling slot; finalize it here
            if slot.mode == ActiveMode::Polling {
                *active = None;
            }
            info
        };

        self.poller.stop().await;

        // Optimistic local finalization, before any network round trip
        if let Some(mut content) = self.store.ai_content(&message_id).await {
            if !content.status.is_terminal() {
                content.status = InvocationStatus::Stopped;
                self.store.patch_ai_content(&message_id, content).await;
            }
        }

        if polling {
            self.settle_idle();
        }

        match invocation_id {
            Some(invocation_id) => {
                tracing::debug!(
                    "[ChatSession] Requesting backend stop for invocation {}",
                    invocation_id
                );
                if let Err(err) = self
                    .invocations
                    .stop_invocation(&profile_id, &invocation_id)
                    .await
                {
                    tracing::warn!("[ChatSession] Best-effort stop call failed: {}", err);
                }
            }
            None => {
                tracing::debug!("[ChatSession] No invocation id known yet; stream aborted locally");
            }
        }
    }

    /// Tear down the session: release the active invocation, drop the
    /// transcript, and return to idle. No timers survive this call.
    pub async fn clear(&self) {
        self.release_active().await;
        self.reset_transcript().await;
        *self.error.write().await = None;
        self.status_tx.send_replace(SessionStatus::Idle);
    }

    // ------------------------------------------------------------------
    // Stream consumption
    // ------------------------------------------------------------------

    async fn run_stream(
        &self,
        profile_id: &str,
        message_id: &str,
        input: &GraphInput,
        cancel: CancellationToken,
    ) -> AppResult<()> {
        let mut progress = TurnProgress::new(message_id);

        tracing::debug!(
            "[ChatSession] Starting graph execution stream for query: {}",
            input.user_query
        );

        let mut stream = match self.transport.open_stream(input, cancel.clone()).await {
            Ok(stream) => stream,
            Err(err) => {
                if cancel.is_cancelled() {
                    self.reconcile_final(profile_id, &mut progress, true).await;
                    return Ok(());
                }
                tracing::error!("[ChatSession] Error during graph execution: {}", err);
                self.set_error(err.to_string()).await;
                self.reconcile_final(profile_id, &mut progress, false).await;
                return Err(err);
            }
        };

        let mut parser = FrameParser::new();
        let mut transport_error: Option<AppError> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for frame in parser.push(&bytes) {
                            self.apply_frame(profile_id, &mut progress, frame).await;
                        }
                    }
                    Some(Err(err)) => {
                        transport_error = Some(err);
                        break;
                    }
                    None => break,
                }
            }
        }

        let cancelled = cancel.is_cancelled();

        if !cancelled {
            for frame in parser.finish() {
                self.apply_frame(profile_id, &mut progress, frame).await;
            }
            tracing::debug!("[ChatSession] Graph execution stream completed");
        }

        let result = match transport_error {
            Some(err) if !cancelled => {
                tracing::error!("[ChatSession] Error during graph execution: {}", err);
                self.set_error(err.to_string()).await;
                Err(err)
            }
            // A read failing after user cancellation is the abort itself,
            // not an error to surface
            _ => Ok(()),
        };

        self.reconcile_final(profile_id, &mut progress, cancelled).await;
        result
    }

    /// Apply one decoded frame. Snapshot fetches triggered here are
    /// awaited before the caller hands over the next frame, so an older
    /// fetch can never overwrite a newer one.
    async fn apply_frame(&self, profile_id: &str, progress: &mut TurnProgress, frame: StreamFrame) {
        if progress.invocation_id.is_none() {
            if let Some(invocation_id) = frame.invocation_id.clone() {
                tracing::debug!(
                    "[ChatSession] Setting invocation id on chat turn: {}",
                    invocation_id
                );
                progress.invocation_id = Some(invocation_id.clone());

                // Share the id with the cancellation path
                {
                    let mut active = self.active.lock().await;
                    if let Some(slot) = active.as_mut() {
                        if slot.message_id == progress.message_id {
                            slot.invocation_id = Some(invocation_id.clone());
                        }
                    }
                }

                match self
                    .turns
                    .update_turn(
                        profile_id,
                        &progress.message_id,
                        TurnPatch::invocation(invocation_id),
                    )
                    .await
                {
                    Ok(_) => progress.persisted = true,
                    Err(err) => {
                        // Retried once on stream close
                        tracing::warn!("[ChatSession] Error updating chat turn: {}", err);
                    }
                }
            }
        }

        match frame.event {
            StreamEvent::GraphStart => {}
            StreamEvent::NodeComplete { node } => {
                if let Some(node) = node {
                    tracing::debug!("[ChatSession] Node {} completed", node);
                }
                self.refresh_steps(profile_id, progress).await;
            }
            StreamEvent::Heartbeat => {
                self.refresh_steps(profile_id, progress).await;
            }
            StreamEvent::GraphComplete => {
                if !progress.status.is_terminal() {
                    progress.status = InvocationStatus::Completed;
                }
            }
            StreamEvent::Stopped => {
                if !progress.status.is_terminal() {
                    progress.status = InvocationStatus::Stopped;
                }
            }
            StreamEvent::Error { message } => {
                if !progress.status.is_terminal() {
                    progress.status = InvocationStatus::Error;
                    progress.error_message = message;
                }
            }
            StreamEvent::Blurb { text } => {
                progress.latest_blurb = Some(text);
            }
        }

        self.republish(progress).await;
    }

    /// Replace the local step list with the authoritative one. Failures
    /// are logged and leave the stale steps in place.
    async fn refresh_steps(&self, profile_id: &str, progress: &mut TurnProgress) {
        let Some(invocation_id) = progress.invocation_id.clone() else {
            return;
        };
        match self
            .invocations
            .fetch_invocation(profile_id, &invocation_id)
            .await
        {
            Ok(invocation) => progress.steps = invocation.steps(),
            Err(err) => {
                tracing::warn!(
                    "[ChatSession] Error fetching invocation for steps update: {}",
                    err
                );
            }
        }
    }

    /// Final reconciliation after the transport closed: one authoritative
    /// snapshot fetch, a last republish, and the deferred invocation-id
    /// persist if the in-stream attempt failed.
    async fn reconcile_final(
        &self,
        profile_id: &str,
        progress: &mut TurnProgress,
        cancelled: bool,
    ) {
        // If the session was cleared or replaced underneath this stream,
        // the transcript no longer contains our turn; leave it alone
        let owned = {
            let active = self.active.lock().await;
            active
                .as_ref()
                .map(|slot| slot.message_id == progress.message_id)
                .unwrap_or(false)
        };
        if !owned {
            return;
        }

        if cancelled && !progress.status.is_terminal() {
            progress.status = InvocationStatus::Stopped;
        }

        let Some(invocation_id) = progress.invocation_id.clone() else {
            self.republish(progress).await;
            return;
        };

        match self
            .invocations
            .fetch_invocation(profile_id, &invocation_id)
            .await
        {
            Ok(invocation) => {
                progress.steps = invocation.steps();
                progress.final_result = invocation.current_result();
                if progress.error_message.is_none() {
                    progress.error_message = invocation.error();
                }
                // Converge on the authoritative status when the stream
                // ended without a terminal event; never downgrade
                if progress.status == InvocationStatus::Running {
                    match invocation.status() {
                        Ok(status) if status.is_terminal() => progress.status = status,
                        Ok(_) => {}
                        Err(err) => tracing::warn!("[ChatSession] {}", err),
                    }
                }
            }
            Err(err) => {
                tracing::warn!("[ChatSession] Error fetching final invocation state: {}", err);
            }
        }

        self.republish(progress).await;

        if !progress.persisted {
            match self
                .turns
                .update_turn(
                    profile_id,
                    &progress.message_id,
                    TurnPatch::invocation(invocation_id),
                )
                .await
            {
                Ok(_) => progress.persisted = true,
                Err(err) => {
                    tracing::warn!("[ChatSession] Error updating chat turn: {}", err);
                }
            }
        }
    }

    async fn republish(&self, progress: &TurnProgress) {
        self.store
            .patch_ai_content(&progress.message_id, progress.content())
            .await;
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Transcript as graph history: user text for human turns, the final
    /// result for AI turns.
    async fn chat_history(&self) -> Vec<SimpleMessage> {
        self.store
            .all()
            .await
            .into_iter()
            .map(|message| match message.content {
                MessageContent::Text(text) => SimpleMessage::human(text),
                MessageContent::Ai(content) => {
                    SimpleMessage::ai(content.final_result.unwrap_or_default())
                }
            })
            .collect()
    }

    /// Rebuild AI message content from the persisted turn plus one
    /// snapshot fetch.
    async fn load_ai_content(&self, profile_id: &str, turn: &ChatTurn) -> AiMessageContent {
        let Some(invocation_id) = turn.data.invocation_id.clone() else {
            return AiMessageContent::running();
        };
        match self
            .invocations
            .fetch_invocation(profile_id, &invocation_id)
            .await
        {
            Ok(invocation) => match invocation.status() {
                Ok(status) => AiMessageContent {
                    invocation_id: Some(invocation.invocation_id.clone()),
                    status,
                    steps: invocation.steps(),
                    final_result: invocation.current_result(),
                    error_message: invocation.error(),
                    latest_blurb: None,
                },
                Err(err) => {
                    tracing::warn!("[ChatSession] {}", err);
                    AiMessageContent::load_failed("Failed to load invocation data")
                }
            },
            Err(err) => {
                tracing::error!(
                    "[ChatSession] Error loading invocation for chat turn: {}",
                    err
                );
                AiMessageContent::load_failed("Failed to load invocation data")
            }
        }
    }

    /// Release the active-invocation slot and any poll timer
    async fn release_active(&self) {
        let slot = self.active.lock().await.take();
        if let Some(slot) = slot {
            slot.cancel.cancel();
        }
        self.poller.stop().await;
    }

    /// Drop the slot owned by a finished stream and return to idle,
    /// unless a newer operation has already advanced the session.
    async fn finish_invocation(&self, message_id: &str) {
        let mut active = self.active.lock().await;
        let owned = active
            .as_ref()
            .map(|slot| slot.message_id == message_id)
            .unwrap_or(false);
        if !owned {
            return;
        }
        *active = None;
        drop(active);
        self.settle_idle();
    }

    /// Return a running session to idle; loading is owned by the loader
    fn settle_idle(&self) {
        self.status_tx.send_if_modified(|status| {
            if *status == SessionStatus::Running {
                *status = SessionStatus::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Back the session out after a failed submission setup
    async fn fail_submission(&self) {
        self.release_active().await;
        self.settle_idle();
    }

    async fn reset_transcript(&self) {
        self.store.clear().await;
        *self.current.write().await = None;
    }
}

fn conversation_title(first_message: &str) -> String {
    let truncated: String = first_message.chars().take(TITLE_MAX_LEN).collect();
    if first_message.chars().count() > TITLE_MAX_LEN {
        format!("{}...", truncated)
    } else {
        truncated
    }
}
