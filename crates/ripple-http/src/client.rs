// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! reqwest-backed [`ChatTransport`] for the chat backend.
//!
//! Transport failures are classified into [`StreamFailure`] here, once,
//! from reqwest's error flags and the I/O error in its source chain.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use ripple_config::ClientConfig;
use ripple_core::{
    ByteStream, ChatRequest, ChatTransport, FeedbackRecord, FeedbackRequest, Message, NetworkKind,
    RippleError, StreamChatRequest, StreamFailure,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{ChatReply, Envelope};

/// HTTP client for the chat backend's `/chat`, `/messages` endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport for `config.base_url`.
    ///
    /// Only the connect phase is timed out: a streaming reply may stay idle
    /// for as long as the agent thinks.
    pub fn new(config: &ClientConfig) -> Result<Self, RippleError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| RippleError::Config(format!("invalid base_url `{base_url}`: {e}")))?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| RippleError::Http {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a request expecting a `{code, data}` JSON envelope.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, RippleError> {
        let response = request.send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RippleError::Http {
                message: format!("HTTP {}: {body}", status.as_u16()),
                source: None,
            });
        }
        let envelope: Envelope<T> = response.json().await.map_err(http_error)?;
        envelope.into_data()
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: &StreamChatRequest) -> Result<ByteStream, StreamFailure> {
        debug!(session_id = %request.session_id, "opening chat stream");
        let response = self
            .client
            .post(self.url("/chat/stream"))
            .json(request)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "stream request rejected");
            return Err(StreamFailure::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| classify(&e))),
        ))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, RippleError> {
        let reply: Option<ChatReply> = self
            .send_json(self.client.post(self.url("/chat")).json(request))
            .await?;
        Ok(reply.map(|r| r.content).unwrap_or_default())
    }

    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<Message>, RippleError> {
        let url = Url::parse_with_params(
            &self.url("/messages/session"),
            &[("session_id", session_id)],
        )
        .map_err(|e| RippleError::Internal(format!("invalid messages url: {e}")))?;
        Ok(self.send_json(self.client.get(url)).await?.unwrap_or_default())
    }

    async fn send_feedback(
        &self,
        message_id: &str,
        feedback: &FeedbackRequest,
    ) -> Result<FeedbackRecord, RippleError> {
        let request = self
            .client
            .post(self.url(&format!("/messages/{message_id}/feedback")))
            .json(feedback);
        Ok(self.send_json(request).await?.unwrap_or_default())
    }
}

pub(crate) fn http_error(e: reqwest::Error) -> RippleError {
    RippleError::Http {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

/// Maps a reqwest failure onto the closed streaming failure set.
pub fn classify(err: &reqwest::Error) -> StreamFailure {
    let message = error_chain(err);

    if err.is_builder() {
        return StreamFailure::Protocol {
            message: format!("invalid request: {message}"),
        };
    }

    let io_kind = io_error_kind(err).map(NetworkKind::from_io_kind);
    let kind = match io_kind {
        Some(kind) if kind != NetworkKind::Other => kind,
        _ if err.is_connect() && is_name_resolution(&message) => NetworkKind::NameResolution,
        _ if err.is_connect() => NetworkKind::FailedToFetch,
        _ if err.is_body() || err.is_decode() => NetworkKind::ConnectionReset,
        _ if err.is_request() || err.is_timeout() => NetworkKind::FailedToFetch,
        _ => NetworkKind::Other,
    };
    StreamFailure::network(kind, message)
}

fn io_error_kind(err: &reqwest::Error) -> Option<std::io::ErrorKind> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = cause.source();
    }
    None
}

// Resolver failures only surface as text from getaddrinfo / hickory.
fn is_name_resolution(chain: &str) -> bool {
    let chain = chain.to_ascii_lowercase();
    chain.contains("dns error") || chain.contains("failed to lookup address")
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{FeedbackRating, Role};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::new(&ClientConfig {
            base_url: format!("{base_url}/api/"),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    fn stream_request() -> StreamChatRequest {
        StreamChatRequest {
            session_id: "7".into(),
            agent_id: "default".into(),
            message: "hello".into(),
            work_dir: None,
        }
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn stream_body_is_passed_through() {
        let server = MockServer::start().await;
        let sse = "event: content_block\ndata: {\"type\":\"text\",\"text\":\"hi\"}\n\n";
        Mock::given(method("POST"))
            .and(path("/api/chat/stream"))
            .and(body_json(serde_json::json!({
                "session_id": "7", "agent_id": "default", "message": "hello"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let stream = transport(&server.uri())
            .open_stream(&stream_request())
            .await
            .unwrap();
        assert_eq!(collect(stream).await, sse.as_bytes());
    }

    #[tokio::test]
    async fn non_2xx_stream_keeps_body_as_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/stream"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = transport(&server.uri())
            .open_stream(&stream_request())
            .await
            .err()
            .unwrap();
        assert_eq!(
            err,
            StreamFailure::Http {
                status: 502,
                body: "upstream down".into()
            }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn refused_connection_is_retryable_network_failure() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport(&format!("http://{addr}"))
            .open_stream(&stream_request())
            .await
            .err()
            .unwrap();
        assert!(err.is_retryable(), "got {err:?}");
    }

    #[tokio::test]
    async fn chat_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200, "data": {"content": "pong"}
            })))
            .mount(&server)
            .await;

        let reply = transport(&server.uri())
            .chat(&ChatRequest {
                session_id: "7".into(),
                agent_id: "default".into(),
                message: "ping".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply, "pong");
    }

    #[tokio::test]
    async fn chat_code_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 400, "message": "session not found"
            })))
            .mount(&server)
            .await;

        let err = transport(&server.uri())
            .chat(&ChatRequest {
                session_id: "x".into(),
                agent_id: "default".into(),
                message: "ping".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RippleError::Api { code: 400, .. }));
    }

    #[tokio::test]
    async fn fetch_messages_decodes_stored_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/session"))
            .and(query_param("session_id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "data": [
                    {"id": 1, "session_id": 7, "type": "user", "status": "completed", "content": "hi"},
                    {"id": 2, "session_id": 7, "type": "assistant", "status": "completed",
                     "content": "{\"text\":\"hello\",\"tool_calls\":[]}"}
                ]
            })))
            .mount(&server)
            .await;

        let messages = transport(&server.uri()).fetch_messages("7").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content.text(), "hello");
        assert_eq!(messages[1].session_id, "7");
    }

    #[tokio::test]
    async fn feedback_returns_stored_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/messages/42/feedback"))
            .and(body_json(serde_json::json!({"rating": "like", "comment": "nice"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "data": {"feedback_rating": "like", "feedback_comment": "nice", "feedback_at": "now"}
            })))
            .mount(&server)
            .await;

        let record = transport(&server.uri())
            .send_feedback(
                "42",
                &FeedbackRequest {
                    rating: FeedbackRating::Like,
                    comment: "nice".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(record.feedback_rating, Some(FeedbackRating::Like));
        assert_eq!(record.feedback_at.as_deref(), Some("now"));
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = HttpTransport::new(&ClientConfig {
            base_url: "not a url".into(),
            ..ClientConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, RippleError::Config(_)));
    }
}
