// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted [`ChatTransport`] for deterministic store tests.
//!
//! Each call to `open_stream` pops the next scripted attempt. An attempt
//! either refuses to open or yields its chunks (and optional failure) in
//! order, optionally hanging forever afterwards so cancellation can be
//! exercised. Every chunk is preceded by a task yield, like a real socket
//! read that has to wait for data.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use ripple_core::{
    ByteStream, ChatRequest, ChatTransport, FeedbackRecord, FeedbackRequest, Message, RippleError,
    StreamChatRequest, StreamFailure,
};

/// One scripted `open_stream` outcome.
#[derive(Debug, Clone)]
pub enum Attempt {
    /// The request fails before a body is available.
    Refuse(StreamFailure),
    /// The body yields `items`, then ends (or hangs when `hang` is set).
    Stream {
        items: Vec<Result<Bytes, StreamFailure>>,
        hang: bool,
    },
}

/// One scripted `chat` outcome.
#[derive(Debug, Clone)]
enum ChatScript {
    Reply(String),
    Fail(String),
    Hang,
}

/// A mock transport driven by pre-loaded scripts.
#[derive(Default)]
pub struct MockTransport {
    attempts: Mutex<VecDeque<Attempt>>,
    stream_requests: Mutex<Vec<StreamChatRequest>>,
    chat_replies: Mutex<VecDeque<ChatScript>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    stored: Mutex<HashMap<String, Vec<Message>>>,
    feedback: Mutex<Option<FeedbackRecord>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attempt whose body is `chunks` followed by a clean end.
    pub fn with_stream<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attempts.get_mut().push_back(Attempt::Stream {
            items: to_items(chunks),
            hang: false,
        });
        self
    }

    /// Adds an attempt whose body is `chunks` followed by `failure`.
    pub fn with_broken_stream<I, S>(mut self, chunks: I, failure: StreamFailure) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items = to_items(chunks);
        items.push(Err(failure));
        self.attempts.get_mut().push_back(Attempt::Stream { items, hang: false });
        self
    }

    /// Adds an attempt whose body is `chunks` and then never ends.
    pub fn with_hanging_stream<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attempts.get_mut().push_back(Attempt::Stream {
            items: to_items(chunks),
            hang: true,
        });
        self
    }

    /// Adds an attempt that fails to open.
    pub fn with_refusal(mut self, failure: StreamFailure) -> Self {
        self.attempts.get_mut().push_back(Attempt::Refuse(failure));
        self
    }

    /// Queues a reply for the non-streaming endpoint.
    pub fn with_chat_reply(mut self, reply: impl Into<String>) -> Self {
        self.chat_replies.get_mut().push_back(ChatScript::Reply(reply.into()));
        self
    }

    /// Queues a failure for the non-streaming endpoint.
    pub fn with_chat_failure(mut self, message: impl Into<String>) -> Self {
        self.chat_replies.get_mut().push_back(ChatScript::Fail(message.into()));
        self
    }

    /// Queues a non-streaming request that never gets an answer.
    pub fn with_hanging_chat(mut self) -> Self {
        self.chat_replies.get_mut().push_back(ChatScript::Hang);
        self
    }

    /// Stores messages returned by `fetch_messages` for `session_id`.
    pub fn with_stored_messages(mut self, session_id: &str, messages: Vec<Message>) -> Self {
        self.stored
            .get_mut()
            .insert(session_id.to_string(), messages);
        self
    }

    /// Makes `send_feedback` succeed with `record`.
    pub fn with_feedback(mut self, record: FeedbackRecord) -> Self {
        *self.feedback.get_mut() = Some(record);
        self
    }

    /// Every stream request received so far.
    pub async fn stream_requests(&self) -> Vec<StreamChatRequest> {
        self.stream_requests.lock().await.clone()
    }

    pub async fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().await.clone()
    }

    /// Scripted attempts not yet consumed.
    pub async fn remaining_attempts(&self) -> usize {
        self.attempts.lock().await.len()
    }
}

fn to_items<I, S>(chunks: I) -> Vec<Result<Bytes, StreamFailure>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    chunks
        .into_iter()
        .map(|c| Ok(Bytes::from(c.into())))
        .collect()
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open_stream(&self, request: &StreamChatRequest) -> Result<ByteStream, StreamFailure> {
        self.stream_requests.lock().await.push(request.clone());
        let attempt = self.attempts.lock().await.pop_front();
        match attempt {
            Some(Attempt::Refuse(failure)) => Err(failure),
            Some(Attempt::Stream { items, hang }) => {
                // Yield before each chunk so observers run between chunks.
                let body = stream::iter(items).then(|item| async move {
                    tokio::task::yield_now().await;
                    item
                });
                if hang {
                    Ok(body.chain(stream::pending()).boxed())
                } else {
                    Ok(body.boxed())
                }
            }
            None => Err(StreamFailure::Protocol {
                message: "no scripted stream attempt left".into(),
            }),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, RippleError> {
        self.chat_requests.lock().await.push(request.clone());
        let script = self.chat_replies.lock().await.pop_front();
        match script {
            Some(ChatScript::Reply(reply)) => Ok(reply),
            Some(ChatScript::Fail(message)) => Err(RippleError::Api { code: 500, message }),
            Some(ChatScript::Hang) => std::future::pending().await,
            None => Ok("mock reply".to_string()),
        }
    }

    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<Message>, RippleError> {
        Ok(self
            .stored
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_feedback(
        &self,
        _message_id: &str,
        _feedback: &FeedbackRequest,
    ) -> Result<FeedbackRecord, RippleError> {
        self.feedback
            .lock()
            .await
            .clone()
            .ok_or_else(|| RippleError::Api {
                code: 404,
                message: "message not found".into(),
            })
    }
}
