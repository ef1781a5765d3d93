// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat store facade.
//!
//! [`ChatStore`] owns the reactive [`StoreState`] and runs one streaming
//! send at a time. A send drives the decoder and interpreter over the
//! transport's byte stream in an explicit retry loop; every state change
//! happens inside the watch channel's lock, which is also where the
//! cancellation token is installed, checked and fired.

use std::sync::{Arc, Mutex, PoisonError};

use bytes::BytesMut;
use futures::StreamExt;
use ripple_config::{ProtocolVariant, RippleConfig};
use ripple_core::{
    ChatRequest, ChatTransport, ConnectionStatus, FeedbackRating, FeedbackRequest, Message,
    MessageContent, MessageStatus, RippleError, Role, SessionProvider, StreamChatRequest,
    StreamFailure,
};
use ripple_stream::{
    Effect, Flow, Interpreter, ReconnectPolicy, ReconnectState, RetryDecision, SseDecoder,
    decode_chunk, decode_remaining,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::{MessageUpdate, StoreState};

/// How a streaming send ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Cancelled,
}

/// How one stream attempt ended.
enum AttemptEnd {
    Completed,
    Failed(String),
    Broken(StreamFailure),
    Cancelled,
}

struct Inner {
    state: watch::Sender<StoreState>,
    transport: Arc<dyn ChatTransport>,
    sessions: Arc<dyn SessionProvider>,
    policy: ReconnectPolicy,
    variant: ProtocolVariant,
    active: Mutex<Option<CancellationToken>>,
}

/// Client-side message store with streaming send and reconnection.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<Inner>,
}

impl ChatStore {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        sessions: Arc<dyn SessionProvider>,
        config: &RippleConfig,
    ) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                transport,
                sessions,
                policy: ReconnectPolicy::from_config(&config.reconnect),
                variant: config.protocol.variant,
                active: Mutex::new(None),
            }),
        }
    }

    // --- reactive accessors ---

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    /// Every message of every session, in insertion order.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.borrow().messages.values().cloned().collect()
    }

    /// Messages of the currently selected session.
    pub fn current_messages(&self) -> Vec<Message> {
        match self.inner.sessions.current_session_id() {
            Some(id) => self.inner.state.borrow().session_messages(&id),
            None => Vec::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.state.borrow().connection_status
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.state.borrow().retry_count
    }

    // --- setters ---

    pub fn set_loading(&self, loading: bool) {
        self.inner.state.send_modify(|s| s.is_loading = loading);
    }

    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.inner.state.send_modify(|s| s.error = Some(error));
    }

    pub fn clear_error(&self) {
        self.inner.state.send_if_modified(|s| s.error.take().is_some());
    }

    pub fn set_connection_status(&self, status: ConnectionStatus) {
        self.inner
            .state
            .send_modify(|s| s.connection_status = status);
    }

    // --- collection operations ---

    /// Adds a message, filling in a missing id, session or timestamp.
    ///
    /// Re-adding a known id merges into the existing entry.
    pub fn add_message(&self, mut message: Message) -> bool {
        if message.id.is_empty() {
            message.id = uuid::Uuid::new_v4().to_string();
        }
        if message.session_id.is_empty()
            && let Some(session_id) = self.inner.sessions.current_session_id()
        {
            message.session_id = session_id;
        }
        if message.created_at.is_empty() {
            message.created_at = chrono::Utc::now().to_rfc3339();
        }

        let mut inserted = false;
        self.inner.state.send_modify(|s| inserted = s.add_message(message));
        inserted
    }

    /// Updates a message unless it has already reached a terminal status.
    pub fn update_message(&self, id: &str, update: MessageUpdate) -> bool {
        self.inner
            .state
            .send_if_modified(|s| s.update_message(id, update))
    }

    /// Drops every message of the current session.
    pub fn clear_current_session(&self) {
        if let Some(session_id) = self.inner.sessions.current_session_id() {
            self.inner
                .state
                .send_modify(|s| s.remove_session(&session_id));
        }
    }

    /// Loads a session's stored messages, replacing the local copies.
    pub async fn fetch_messages_by_session(&self, session_id: &str) -> Result<(), RippleError> {
        match self.inner.transport.fetch_messages(session_id).await {
            Ok(messages) => {
                debug!(session_id, count = messages.len(), "loaded session messages");
                self.inner
                    .state
                    .send_modify(|s| s.replace_session(session_id, messages));
                Ok(())
            }
            Err(e) => {
                warn!(session_id, error = %e, "failed to load session messages");
                self.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Selects `session_id` and loads its messages.
    pub async fn switch_session(&self, session_id: &str) -> Result<(), RippleError> {
        self.inner
            .sessions
            .set_current_session(Some(session_id.to_string()));
        self.fetch_messages_by_session(session_id).await
    }

    /// Records feedback on a message. Failures are logged, not surfaced.
    pub async fn send_feedback(
        &self,
        message_id: &str,
        rating: FeedbackRating,
        comment: impl Into<String>,
    ) -> bool {
        let request = FeedbackRequest {
            rating,
            comment: comment.into(),
        };
        match self.inner.transport.send_feedback(message_id, &request).await {
            Ok(record) => {
                self.inner
                    .state
                    .send_if_modified(|s| s.set_feedback(message_id, record));
                true
            }
            Err(e) => {
                warn!(message_id, error = %e, "failed to send feedback");
                false
            }
        }
    }

    // --- connection control ---

    /// Aborts the in-flight send, if any.
    ///
    /// The streaming message is marked failed and no pending retry runs.
    pub fn cancel_streaming(&self) {
        let max_retries = self.inner.policy.max_retries;
        self.inner.state.send_modify(|s| {
            if let Some(token) = self.take_active() {
                info!("cancelling stream");
                token.cancel();
            }
            s.retry_count = max_retries;
            if let Some(id) = s.streaming_message_id.take() {
                s.update_message(&id, MessageUpdate::status(MessageStatus::Failed));
            }
            s.connection_status = ConnectionStatus::Disconnected;
            s.is_loading = false;
        });
    }

    /// Same as [`cancel_streaming`](Self::cancel_streaming).
    pub fn disconnect(&self) {
        self.cancel_streaming();
    }

    pub fn reset_reconnect_count(&self) {
        self.inner.state.send_modify(|s| {
            s.retry_count = 0;
            s.connection_status = ConnectionStatus::Connected;
        });
    }

    // --- sending ---

    /// Sends `content` over the streaming endpoint and follows the reply
    /// until it completes, fails or is cancelled.
    ///
    /// Returns [`RippleError::Busy`] while another send is in flight.
    pub async fn send_message(
        &self,
        content: &str,
        directory: Option<&str>,
    ) -> Result<SendOutcome, RippleError> {
        let token = self.begin_send()?;

        let session_id = match self.ensure_session(&token).await {
            Ok(Some(id)) => id,
            Ok(None) => return Ok(SendOutcome::Cancelled),
            Err(e) => {
                self.update(&token, |s| {
                    s.error = Some(e.to_string());
                    self.settle(s);
                });
                return Err(e);
            }
        };

        let request = StreamChatRequest {
            session_id: session_id.clone(),
            agent_id: self.inner.sessions.current_agent_id(),
            message: content.to_string(),
            work_dir: directory.filter(|d| !d.is_empty()).map(str::to_string),
        };
        info!(session_id = %session_id, variant = %self.inner.variant, "sending message");

        let mut interpreter = Interpreter::new(self.inner.variant, &session_id, content);
        let start = interpreter.start();
        self.apply(&token, &interpreter, start);

        self.stream_with_retry(&request, &mut interpreter, &token)
            .await
    }

    /// Sends `content` over the plain request/response endpoint.
    ///
    /// Claims the store like [`send_message`](Self::send_message): it returns
    /// [`RippleError::Busy`] while another send is in flight, and a
    /// cancellation ends it with [`StreamFailure::Aborted`].
    pub async fn send_message_non_streaming(&self, content: &str) -> Result<Message, RippleError> {
        let token = self.begin_send()?;

        let session_id = match self.ensure_session(&token).await {
            Ok(Some(id)) => id,
            Ok(None) => return Err(StreamFailure::Aborted.into()),
            Err(e) => {
                self.update(&token, |s| {
                    s.error = Some(e.to_string());
                    self.settle(s);
                });
                return Err(e);
            }
        };

        let user = Message::new(
            format!("local-{}-user", uuid::Uuid::new_v4()),
            &session_id,
            Role::User,
        )
        .with_content(MessageContent::from_text(content))
        .with_created_at(chrono::Utc::now().to_rfc3339());
        self.update(&token, |s| {
            s.add_message(user);
        });

        let request = ChatRequest {
            session_id: session_id.clone(),
            agent_id: self.inner.sessions.current_agent_id(),
            message: content.to_string(),
        };
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(StreamFailure::Aborted.into()),
            result = self.inner.transport.chat(&request) => result,
        };

        match result {
            Ok(reply) => {
                let message = Message::new(
                    format!("local-{}-assistant", uuid::Uuid::new_v4()),
                    &session_id,
                    Role::Assistant,
                )
                .with_content(MessageContent::from_text(reply))
                .with_created_at(chrono::Utc::now().to_rfc3339());
                let stored = message.clone();
                if !self.update(&token, |s| {
                    s.add_message(stored);
                    self.settle(s);
                }) {
                    return Err(StreamFailure::Aborted.into());
                }
                Ok(message)
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                self.update(&token, |s| {
                    s.error = Some(e.to_string());
                    self.settle(s);
                });
                Err(e)
            }
        }
    }

    /// Claims the store for one send. Loading, the cleared error and the new
    /// token are published atomically.
    fn begin_send(&self) -> Result<CancellationToken, RippleError> {
        let token = CancellationToken::new();
        let mut busy = false;
        self.inner.state.send_if_modified(|s| {
            if s.is_loading {
                busy = true;
                return false;
            }
            s.is_loading = true;
            s.error = None;
            s.retry_count = 0;
            s.streaming_message_id = None;
            *self.lock_active() = Some(token.clone());
            true
        });
        if busy {
            return Err(RippleError::Busy);
        }
        Ok(token)
    }

    async fn ensure_session(&self, token: &CancellationToken) -> Result<Option<String>, RippleError> {
        if let Some(id) = self.inner.sessions.current_session_id() {
            return Ok(Some(id));
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Ok(None),
            session = self.inner.sessions.create_session(None) => session.map(|s| Some(s.id)),
        }
    }

    async fn stream_with_retry(
        &self,
        request: &StreamChatRequest,
        interpreter: &mut Interpreter,
        token: &CancellationToken,
    ) -> Result<SendOutcome, RippleError> {
        let mut reconnect = ReconnectState::new(self.inner.policy.clone());
        self.update(token, |s| s.connection_status = ConnectionStatus::Connecting);

        loop {
            match self.run_attempt(request, interpreter, token).await {
                AttemptEnd::Completed => {
                    let effects = interpreter.finish();
                    let finished = self.update(token, |s| {
                        effects.into_iter().for_each(|e| s.apply(e));
                        s.connection_status = ConnectionStatus::Connected;
                        self.settle(s);
                    });
                    if !finished {
                        return Ok(SendOutcome::Cancelled);
                    }
                    info!("stream completed");
                    return Ok(SendOutcome::Completed);
                }
                AttemptEnd::Failed(message) => {
                    self.update(token, |s| {
                        s.connection_status = ConnectionStatus::Disconnected;
                        self.settle(s);
                    });
                    return Err(StreamFailure::Protocol { message }.into());
                }
                AttemptEnd::Cancelled => return Ok(SendOutcome::Cancelled),
                AttemptEnd::Broken(failure) => match reconnect.on_failure(&failure) {
                    RetryDecision::Retry { attempt, delay } => {
                        interpreter.interrupt();
                        let max = reconnect.max_retries();
                        warn!(
                            error = %failure,
                            attempt,
                            max,
                            delay_ms = delay.as_millis() as u64,
                            "stream interrupted, reconnecting"
                        );
                        let notified = self.update(token, |s| {
                            s.retry_count = attempt;
                            s.connection_status = ConnectionStatus::Reconnecting;
                            s.error = Some(format!("reconnecting ({attempt}/{max})"));
                        });
                        if !notified {
                            return Ok(SendOutcome::Cancelled);
                        }
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => return Ok(SendOutcome::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    RetryDecision::GiveUp => {
                        warn!(error = %failure, retries = reconnect.retry_count(), "stream failed");
                        let effects = interpreter.fail();
                        let detail = failure_detail(&failure);
                        let surfaced = self.update(token, |s| {
                            effects.into_iter().for_each(|e| s.apply(e));
                            s.error = Some(detail);
                            s.connection_status = ConnectionStatus::Disconnected;
                            self.settle(s);
                        });
                        if !surfaced {
                            return Ok(SendOutcome::Cancelled);
                        }
                        return Err(failure.into());
                    }
                },
            }
        }
    }

    /// Runs one request: open, read until end, failure, or cancellation.
    async fn run_attempt(
        &self,
        request: &StreamChatRequest,
        interpreter: &mut Interpreter,
        token: &CancellationToken,
    ) -> AttemptEnd {
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return AttemptEnd::Cancelled,
            opened = self.inner.transport.open_stream(request) => opened,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(failure) => return AttemptEnd::Broken(failure),
        };

        let connected = self.update(token, |s| {
            if s.retry_count > 0 {
                s.error = None;
            }
            s.connection_status = ConnectionStatus::Connected;
        });
        if !connected {
            return AttemptEnd::Cancelled;
        }

        let mut decoder = SseDecoder::for_variant(interpreter.configured_variant());
        let mut buf = BytesMut::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return AttemptEnd::Cancelled,
                next = body.next() => next,
            };
            let ended = next.is_none();
            let records = match next {
                Some(Ok(chunk)) => decode_chunk(&mut decoder, &mut buf, &chunk),
                Some(Err(failure)) => return AttemptEnd::Broken(failure),
                None => decode_remaining(&mut decoder, &mut buf),
            };

            for record in records {
                debug!(event = %record.event, "stream record");
                let step = interpreter.apply(record);
                let error = step.effects.iter().rev().find_map(|e| match e {
                    Effect::Error(message) => Some(message.clone()),
                    _ => None,
                });
                if !self.apply(token, interpreter, step.effects) {
                    return AttemptEnd::Cancelled;
                }
                match step.flow {
                    Flow::Continue => {}
                    Flow::Done => return AttemptEnd::Completed,
                    Flow::Failed => {
                        return AttemptEnd::Failed(error.unwrap_or_else(|| "stream error".into()));
                    }
                }
            }

            if ended {
                return AttemptEnd::Completed;
            }
        }
    }

    /// Applies interpreter effects and publishes the streaming target.
    fn apply(&self, token: &CancellationToken, interpreter: &Interpreter, effects: Vec<Effect>) -> bool {
        let target = interpreter.target().map(str::to_string);
        self.update(token, |s| {
            effects.into_iter().for_each(|e| s.apply(e));
            s.streaming_message_id = target;
        })
    }

    /// Mutates the state unless `token` has been cancelled. Returns whether
    /// the mutation ran.
    fn update(&self, token: &CancellationToken, f: impl FnOnce(&mut StoreState)) -> bool {
        let mut ran = false;
        self.inner.state.send_if_modified(|s| {
            if token.is_cancelled() {
                return false;
            }
            f(s);
            ran = true;
            true
        });
        ran
    }

    /// Ends the current send. Runs inside the state lock so a new send can
    /// only claim the store after the old token is gone.
    fn settle(&self, s: &mut StoreState) {
        s.streaming_message_id = None;
        s.is_loading = false;
        self.lock_active().take();
    }

    fn take_active(&self) -> Option<CancellationToken> {
        self.lock_active().take()
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Text surfaced in the store error for a failure that ended a send.
fn failure_detail(failure: &StreamFailure) -> String {
    match failure {
        StreamFailure::Http { status, body } if body.trim().is_empty() => format!("HTTP {status}"),
        StreamFailure::Http { body, .. } => body.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::NetworkKind;
    use ripple_test_utils::{MockSessions, MockTransport, sse};
    use tracing_test::traced_test;

    fn store(transport: MockTransport) -> (ChatStore, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let store = ChatStore::new(
            transport.clone(),
            Arc::new(MockSessions::with_current("s1")),
            &RippleConfig::default(),
        );
        (store, transport)
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn reconnect_is_logged_and_notice_cleared() {
        let (store, _) = store(
            MockTransport::new()
                .with_refusal(StreamFailure::network(NetworkKind::ConnectionRefused, "refused"))
                .with_stream([sse::message_created("a1", "s1", "assistant", ""), sse::done()]),
        );

        let outcome = store.send_message("hi", None).await.unwrap();
        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(store.error(), None);
        assert_eq!(store.retry_count(), 1);
        assert!(logs_contain("stream interrupted, reconnecting"));
    }

    #[tokio::test]
    async fn http_failure_surfaces_body_without_retry() {
        let (store, transport) = store(
            MockTransport::new()
                .with_refusal(StreamFailure::Http {
                    status: 500,
                    body: "agent crashed".into(),
                })
                .with_stream([sse::done()]),
        );

        let err = store.send_message("hi", None).await.unwrap_err();
        assert!(matches!(err, RippleError::Stream(StreamFailure::Http { status: 500, .. })));
        assert_eq!(store.error().as_deref(), Some("agent crashed"));
        assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
        assert!(!store.is_loading());
        assert_eq!(transport.remaining_attempts().await, 1);
    }

    #[tokio::test]
    async fn directory_becomes_work_dir() {
        let (store, transport) = store(MockTransport::new().with_stream([sse::done()]));
        store.send_message("ls", Some("/tmp/project")).await.unwrap();
        let requests = transport.stream_requests().await;
        assert_eq!(requests[0].work_dir.as_deref(), Some("/tmp/project"));
        assert_eq!(requests[0].session_id, "s1");
        assert_eq!(requests[0].agent_id, "default");
    }

    #[test]
    fn failure_detail_prefers_body() {
        assert_eq!(
            failure_detail(&StreamFailure::Http {
                status: 404,
                body: "  ".into()
            }),
            "HTTP 404"
        );
        assert_eq!(
            failure_detail(&StreamFailure::network(NetworkKind::ConnectionReset, "reset")),
            "network error (connection_reset): reset"
        );
    }
}
