//! Polling Fallback Scheduler
//!
//! Periodic authoritative-state refresh for an invocation that has no live
//! stream attached: resumed conversations whose last AI turn is still
//! running. One timer task per session; starting a new poll cancels the
//! previous one, and the task stops itself once the invocation reaches a
//! terminal status or its target message disappears from the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::chat::{AiMessageContent, SessionStatus};
use crate::services::backend::InvocationClient;
use crate::services::store::MessageStore;

/// Documented poll interval
pub const INVOCATION_POLL_INTERVAL: Duration = Duration::from_millis(3000);

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Per-session invocation poller.
///
/// The timer handle is owned here, never in module scope, so independent
/// sessions (and tests) cannot interfere with each other.
pub struct InvocationPoller {
    store: Arc<MessageStore>,
    invocations: Arc<dyn InvocationClient>,
    interval: Duration,
    active: Mutex<Option<PollTask>>,
}

enum PollOutcome {
    Continue,
    Finished,
}

impl InvocationPoller {
    /// Create a poller with the documented interval
    pub fn new(store: Arc<MessageStore>, invocations: Arc<dyn InvocationClient>) -> Self {
        Self::with_interval(store, invocations, INVOCATION_POLL_INTERVAL)
    }

    /// Create a poller with a custom interval
    pub fn with_interval(
        store: Arc<MessageStore>,
        invocations: Arc<dyn InvocationClient>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            invocations,
            interval,
            active: Mutex::new(None),
        }
    }

    /// Start polling an invocation, updating the given message.
    ///
    /// Any previous timer for this poller is cancelled first; one fetch is
    /// performed immediately, then on every interval tick. `status` is
    /// flipped back to idle when the invocation reaches a terminal state.
    pub async fn start(
        &self,
        profile_id: &str,
        invocation_id: &str,
        message_id: &str,
        status: Arc<watch::Sender<SessionStatus>>,
    ) {
        self.stop().await;

        tracing::debug!("[InvocationPoller] Starting to poll invocation {}", invocation_id);

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let store = self.store.clone();
        let invocations = self.invocations.clone();
        let interval = self.interval;
        let profile_id = profile_id.to_string();
        let invocation_id = invocation_id.to_string();
        let message_id = message_id.to_string();

        let handle = tokio::spawn(async move {
            loop {
                let outcome = poll_once(
                    &store,
                    invocations.as_ref(),
                    &profile_id,
                    &invocation_id,
                    &message_id,
                    &status,
                )
                .await;

                if matches!(outcome, PollOutcome::Finished) {
                    break;
                }

                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });

        let mut active = self.active.lock().await;
        *active = Some(PollTask { cancel, handle });
    }

    /// Stop any active poll timer. Safe to call when none is active.
    pub async fn stop(&self) {
        let task = self.active.lock().await.take();
        if let Some(task) = task {
            task.cancel.cancel();
            if task.handle.is_finished() {
                tracing::debug!("[InvocationPoller] Poll task already finished");
            } else {
                tracing::debug!("[InvocationPoller] Stopped polling for invocation status");
            }
        }
    }

    /// Whether a poll task is currently installed and running
    pub async fn is_active(&self) -> bool {
        let active = self.active.lock().await;
        active
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }
}

async fn poll_once(
    store: &MessageStore,
    invocations: &dyn InvocationClient,
    profile_id: &str,
    invocation_id: &str,
    message_id: &str,
    status: &watch::Sender<SessionStatus>,
) -> PollOutcome {
    let invocation = match invocations.fetch_invocation(profile_id, invocation_id).await {
        Ok(invocation) => invocation,
        Err(err) => {
            tracing::warn!("[InvocationPoller] Error polling invocation status: {}", err);
            return PollOutcome::Continue;
        }
    };

    if store.get(message_id).await.is_none() {
        tracing::warn!(
            "[InvocationPoller] Message {} not found during polling",
            message_id
        );
        return PollOutcome::Finished;
    }

    let invocation_status = match invocation.status() {
        Ok(invocation_status) => invocation_status,
        Err(err) => {
            tracing::warn!("[InvocationPoller] {}", err);
            return PollOutcome::Continue;
        }
    };

    let content = AiMessageContent {
        invocation_id: Some(invocation.invocation_id.clone()),
        status: invocation_status,
        steps: invocation.steps(),
        final_result: invocation.current_result(),
        error_message: invocation.error(),
        latest_blurb: invocation.blurb(),
    };
    store.patch_ai_content(message_id, content).await;

    if invocation_status.is_terminal() {
        tracing::debug!(
            "[InvocationPoller] Invocation {} reached terminal state: {:?}",
            invocation_id,
            invocation_status
        );
        // Only unwind a running session; a concurrent load owns the status
        // once it has moved the session to loading.
        status.send_if_modified(|current| {
            if *current == SessionStatus::Running {
                *current = SessionStatus::Idle;
                true
            } else {
                false
            }
        });
        return PollOutcome::Finished;
    }

    PollOutcome::Continue
}
