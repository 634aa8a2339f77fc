//! Session State Store
//!
//! Ordered, id-keyed collection of transcript messages. This is the single
//! source of UI truth: the lifecycle controller and the polling scheduler
//! both patch message state exclusively through this store.
//!
//! Transcripts are order-sensitive, so an explicit insertion-order index is
//! kept alongside the id map. Consumers observe changes through a watch
//! revision counter rather than implicit reactivity.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::models::chat::{AiMessageContent, ChatMessageViewModel, MessageContent};

#[derive(Default)]
struct StoreInner {
    /// Message ids in insertion order
    order: Vec<String>,
    /// Messages keyed by turn id
    by_id: HashMap<String, ChatMessageViewModel>,
}

/// Ordered message store for one chat session
pub struct MessageStore {
    inner: RwLock<StoreInner>,
    revision: watch::Sender<u64>,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            inner: RwLock::new(StoreInner::default()),
            revision,
        })
    }

    /// Insert or replace a message.
    ///
    /// Insertion order is recorded on first insert and never changes on
    /// replacement. An update that would regress a terminal AI status for
    /// the same invocation is ignored.
    pub async fn upsert(&self, message: ChatMessageViewModel) {
        let mut inner = self.inner.write().await;

        let is_new = match inner.by_id.get(&message.id) {
            Some(existing) if *existing == message => return,
            Some(existing) if Self::regresses_terminal(existing, &message) => {
                tracing::debug!(
                    "[MessageStore] Ignoring update that would regress terminal message {}",
                    message.id
                );
                return;
            }
            Some(_) => false,
            None => true,
        };

        if is_new {
            inner.order.push(message.id.clone());
        }
        inner.by_id.insert(message.id.clone(), message);
        drop(inner);
        self.bump();
    }

    /// Replace the content of an existing AI message, preserving its role
    /// and timestamp. Returns `false` if the message is not in the store.
    pub async fn patch_ai_content(&self, id: &str, content: AiMessageContent) -> bool {
        let message = {
            let inner = self.inner.read().await;
            match inner.by_id.get(id) {
                Some(existing) => {
                    let mut updated = existing.clone();
                    updated.content = MessageContent::Ai(content);
                    updated
                }
                None => return false,
            }
        };
        self.upsert(message).await;
        true
    }

    /// Get a message by id
    pub async fn get(&self, id: &str) -> Option<ChatMessageViewModel> {
        let inner = self.inner.read().await;
        inner.by_id.get(id).cloned()
    }

    /// AI content of a message, if present and an AI message
    pub async fn ai_content(&self, id: &str) -> Option<AiMessageContent> {
        let inner = self.inner.read().await;
        inner.by_id.get(id).and_then(|m| m.ai_content().cloned())
    }

    /// All messages in insertion order
    pub async fn all(&self) -> Vec<ChatMessageViewModel> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    /// The most recently inserted message
    pub async fn last(&self) -> Option<ChatMessageViewModel> {
        let inner = self.inner.read().await;
        inner
            .order
            .last()
            .and_then(|id| inner.by_id.get(id).cloned())
    }

    /// Number of messages
    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.order.is_empty()
    }

    /// Remove all messages
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        if inner.order.is_empty() {
            return;
        }
        inner.order.clear();
        inner.by_id.clear();
        drop(inner);
        self.bump();
    }

    /// Subscribe to change notifications. The carried value is a revision
    /// counter; receivers re-read snapshots on change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn regresses_terminal(existing: &ChatMessageViewModel, update: &ChatMessageViewModel) -> bool {
        let (Some(old), Some(new)) = (existing.ai_content(), update.ai_content()) else {
            return false;
        };
        old.status.is_terminal()
            && old.invocation_id == new.invocation_id
            && new.status != old.status
    }
}
