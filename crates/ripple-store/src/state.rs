// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot of everything the UI observes.

use indexmap::IndexMap;
use ripple_core::{ConnectionStatus, FeedbackRecord, Message, MessageContent, MessageStatus};
use ripple_stream::Effect;

/// Observable store state, published through a `tokio::sync::watch` channel.
///
/// `messages` is keyed by message id in insertion order and shared by all
/// sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub messages: IndexMap<String, Message>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub connection_status: ConnectionStatus,
    /// Assistant message receiving the in-flight stream.
    pub streaming_message_id: Option<String>,
    /// Retries consumed by the current send.
    pub retry_count: u32,
}

/// Partial update of a message. Identity fields cannot be changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageUpdate {
    pub status: Option<MessageStatus>,
    pub content: Option<MessageContent>,
}

impl MessageUpdate {
    pub fn status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            content: None,
        }
    }

    pub fn content(content: MessageContent) -> Self {
        Self {
            status: None,
            content: Some(content),
        }
    }
}

impl StoreState {
    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    /// Messages of one session, in collection order.
    pub fn session_messages(&self, session_id: &str) -> Vec<Message> {
        self.messages
            .values()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Inserts `message`, or merges it into the existing entry with the same id.
    ///
    /// A merge never changes `session_id` and never touches a terminal
    /// message. Returns true when a new entry was created.
    pub fn add_message(&mut self, message: Message) -> bool {
        match self.messages.get_mut(&message.id) {
            Some(existing) => {
                if !existing.status.is_terminal() {
                    existing.status = message.status;
                    if !message.content.is_empty() {
                        existing.content = message.content;
                    }
                    if existing.created_at.is_empty() {
                        existing.created_at = message.created_at;
                    }
                }
                false
            }
            None => {
                self.messages.insert(message.id.clone(), message);
                true
            }
        }
    }

    /// Applies `update` to a non-terminal message. Returns true if it changed.
    pub fn update_message(&mut self, id: &str, update: MessageUpdate) -> bool {
        let Some(message) = self.messages.get_mut(id) else {
            return false;
        };
        if message.status.is_terminal() {
            return false;
        }
        let mut changed = false;
        if let Some(content) = update.content {
            changed |= message.content != content;
            message.content = content;
        }
        if let Some(status) = update.status {
            changed |= message.status != status;
            message.status = status;
        }
        changed
    }

    /// Feedback is recorded on finished messages, so it bypasses the terminal guard.
    pub fn set_feedback(&mut self, id: &str, record: FeedbackRecord) -> bool {
        let Some(message) = self.messages.get_mut(id) else {
            return false;
        };
        message.feedback_rating = record.feedback_rating;
        message.feedback_comment = record.feedback_comment;
        message.feedback_at = record.feedback_at;
        true
    }

    /// Replaces every message of `session_id` with `messages`.
    pub fn replace_session(&mut self, session_id: &str, messages: Vec<Message>) {
        self.remove_session(session_id);
        for message in messages {
            self.add_message(message);
        }
    }

    pub fn remove_session(&mut self, session_id: &str) {
        self.messages.retain(|_, m| m.session_id != session_id);
    }

    /// Applies one interpreter effect.
    pub fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Insert(message) => {
                self.messages.entry(message.id.clone()).or_insert(message);
            }
            Effect::Content { id, content } => {
                self.update_message(&id, MessageUpdate::content(content));
            }
            Effect::Status { id, status } => {
                self.update_message(&id, MessageUpdate::status(status));
            }
            Effect::Error(error) => self.error = Some(error),
        }
    }
}
