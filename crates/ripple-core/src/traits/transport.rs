// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for the chat backend's HTTP surface.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::{RippleError, StreamFailure};
use crate::types::{ChatRequest, FeedbackRecord, FeedbackRequest, Message, StreamChatRequest};

/// Raw response body of a streaming request, chunked at arbitrary boundaries.
///
/// Read failures are already classified into [`StreamFailure`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamFailure>> + Send>>;

/// Access to the chat backend.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Opens `POST {base}/chat/stream` and returns its body once the status is 2xx.
    async fn open_stream(&self, request: &StreamChatRequest) -> Result<ByteStream, StreamFailure>;

    /// Sends `POST {base}/chat` and returns the assistant's reply text.
    async fn chat(&self, request: &ChatRequest) -> Result<String, RippleError>;

    /// Loads every stored message of a session.
    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<Message>, RippleError>;

    /// Records feedback on a message and returns the stored feedback fields.
    async fn send_feedback(
        &self,
        message_id: &str,
        feedback: &FeedbackRequest,
    ) -> Result<FeedbackRecord, RippleError>;
}
