//! In-memory transport for tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

use super::Transport;
use super::types::SourceMessage;
use crate::error::{TransportError, TransportResult};

const FIRST_MESSAGE_ID: i64 = 1000;

/// A failure to inject into a future call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    RateLimited(Duration),
    NotFound,
    NotModified,
}

impl ScriptedFailure {
    fn into_error(self, what: String) -> TransportError {
        match self {
            ScriptedFailure::RateLimited(wait) => TransportError::RateLimited(wait),
            ScriptedFailure::NotFound => TransportError::NotFound(what),
            ScriptedFailure::NotModified => TransportError::NotModified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRecord {
    pub source_chat_id: i64,
    pub source_message_id: i64,
    pub target_chat_id: i64,
    pub new_message_id: i64,
    pub caption: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    chats: HashMap<i64, BTreeMap<i64, SourceMessage>>,
    next_ids: HashMap<i64, i64>,
    fetch_failures: HashMap<i64, VecDeque<ScriptedFailure>>,
    copy_failures: HashMap<i64, VecDeque<ScriptedFailure>>,
    edit_failures: VecDeque<ScriptedFailure>,
    foreign_posts_after: HashMap<i64, i64>,
    fetch_calls: Vec<(i64, Vec<i64>)>,
    copies: Vec<CopyRecord>,
    sent: Vec<(i64, i64, String)>,
    edits: Vec<(i64, i64, String)>,
    deleted: Vec<(i64, i64)>,
}

impl MockState {
    fn allocate_id(&mut self, chat_id: i64) -> i64 {
        let next = self.next_ids.entry(chat_id).or_insert(FIRST_MESSAGE_ID);
        let id = *next;
        *next += 1;
        id
    }
}

/// Records every call; messages live in per-chat maps.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a message in its chat.
    pub async fn add_message(&self, message: SourceMessage) {
        let mut state = self.state.lock().await;
        state
            .chats
            .entry(message.chat_id)
            .or_default()
            .insert(message.message_id, message);
    }

    /// Seed plain text messages `first..=last` in `chat_id`.
    pub async fn add_range(&self, chat_id: i64, first: i64, last: i64) {
        for id in first..=last {
            self.add_message(SourceMessage::new(chat_id, id).with_text(format!("message {}", id)))
                .await;
        }
    }

    /// Remove a message as if deleted out-of-band.
    pub async fn remove_message(&self, chat_id: i64, message_id: i64) {
        let mut state = self.state.lock().await;
        if let Some(chat) = state.chats.get_mut(&chat_id) {
            chat.remove(&message_id);
        }
    }

    /// Fail the next fetch whose first requested id is `first_id`.
    pub async fn fail_fetch(&self, first_id: i64, failure: ScriptedFailure) {
        let mut state = self.state.lock().await;
        state
            .fetch_failures
            .entry(first_id)
            .or_default()
            .push_back(failure);
    }

    /// Fail the next copy of source message `message_id`.
    pub async fn fail_copy(&self, message_id: i64, failure: ScriptedFailure) {
        let mut state = self.state.lock().await;
        state
            .copy_failures
            .entry(message_id)
            .or_default()
            .push_back(failure);
    }

    pub async fn fail_edit(&self, failure: ScriptedFailure) {
        self.state.lock().await.edit_failures.push_back(failure);
    }

    /// After copying `source_id`, `count` unrelated posts land in the target chat.
    pub async fn interleave_after(&self, source_id: i64, count: i64) {
        self.state
            .lock()
            .await
            .foreign_posts_after
            .insert(source_id, count);
    }

    pub async fn copies(&self) -> Vec<CopyRecord> {
        self.state.lock().await.copies.clone()
    }

    pub async fn fetch_calls(&self) -> Vec<(i64, Vec<i64>)> {
        self.state.lock().await.fetch_calls.clone()
    }

    /// `(chat_id, message_id, text)` of every sent message.
    pub async fn sent(&self) -> Vec<(i64, i64, String)> {
        self.state.lock().await.sent.clone()
    }

    pub async fn edits(&self) -> Vec<(i64, i64, String)> {
        self.state.lock().await.edits.clone()
    }

    pub async fn deleted(&self) -> Vec<(i64, i64)> {
        self.state.lock().await.deleted.clone()
    }

    pub async fn message(&self, chat_id: i64, message_id: i64) -> Option<SourceMessage> {
        let state = self.state.lock().await;
        state.chats.get(&chat_id)?.get(&message_id).cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_messages(&self, chat_id: i64, ids: &[i64]) -> TransportResult<Vec<SourceMessage>> {
        let mut state = self.state.lock().await;
        state.fetch_calls.push((chat_id, ids.to_vec()));

        if let Some(first) = ids.first()
            && let Some(failure) = state
                .fetch_failures
                .get_mut(first)
                .and_then(VecDeque::pop_front)
        {
            return Err(failure.into_error(format!("fetch from {}", first)));
        }

        let chat = state.chats.get(&chat_id);
        Ok(ids
            .iter()
            .filter_map(|id| chat.and_then(|messages| messages.get(id)).cloned())
            .collect())
    }

    async fn copy_message(
        &self,
        message: &SourceMessage,
        target_chat_id: i64,
        caption: Option<&str>,
    ) -> TransportResult<i64> {
        let mut state = self.state.lock().await;

        if let Some(failure) = state
            .copy_failures
            .get_mut(&message.message_id)
            .and_then(VecDeque::pop_front)
        {
            return Err(failure.into_error(format!("copy of {}", message.message_id)));
        }

        let new_id = state.allocate_id(target_chat_id);
        let mut copy = message.clone();
        copy.chat_id = target_chat_id;
        copy.message_id = new_id;
        if let Some(caption) = caption {
            copy.caption = Some(caption.to_string());
        }
        state
            .chats
            .entry(target_chat_id)
            .or_default()
            .insert(new_id, copy);
        state.copies.push(CopyRecord {
            source_chat_id: message.chat_id,
            source_message_id: message.message_id,
            target_chat_id,
            new_message_id: new_id,
            caption: caption.map(str::to_string),
        });

        if let Some(count) = state.foreign_posts_after.get(&message.message_id).copied() {
            for _ in 0..count {
                let id = state.allocate_id(target_chat_id);
                state
                    .chats
                    .entry(target_chat_id)
                    .or_default()
                    .insert(id, SourceMessage::new(target_chat_id, id).with_text("foreign post"));
            }
        }
        Ok(new_id)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> TransportResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.allocate_id(chat_id);
        state
            .chats
            .entry(chat_id)
            .or_default()
            .insert(id, SourceMessage::new(chat_id, id).with_text(text));
        state.sent.push((chat_id, id, text.to_string()));
        Ok(id)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> TransportResult<()> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.edit_failures.pop_front() {
            return Err(failure.into_error(format!("edit of {}", message_id)));
        }
        let Some(message) = state
            .chats
            .get_mut(&chat_id)
            .and_then(|chat| chat.get_mut(&message_id))
        else {
            return Err(TransportError::NotFound(format!(
                "message to edit not found: {}",
                message_id
            )));
        };
        message.text = Some(text.to_string());
        state.edits.push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn delete_messages(&self, chat_id: i64, ids: &[i64]) -> TransportResult<()> {
        let mut state = self.state.lock().await;
        for id in ids {
            if let Some(chat) = state.chats.get_mut(&chat_id) {
                chat.remove(id);
            }
            state.deleted.push((chat_id, *id));
        }
        Ok(())
    }
}
