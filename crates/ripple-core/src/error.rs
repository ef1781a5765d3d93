// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ripple chat client.

use thiserror::Error;

/// The primary error type returned by Ripple's public operations.
#[derive(Debug, Error)]
pub enum RippleError {
    /// Configuration errors (invalid TOML, bad base URL, header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failures outside the streaming path.
    #[error("http error: {message}")]
    Http {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend answered with a JSON envelope whose `code` is not 200.
    #[error("api error ({code}): {message}")]
    Api { code: i64, message: String },

    /// A streaming attempt ended in a failure that was not recovered.
    #[error(transparent)]
    Stream(#[from] StreamFailure),

    /// A streaming send is already in flight on this store.
    #[error("a message is already being streamed")]
    Busy,

    /// The session collaborator could not provide a session.
    #[error("session error: {0}")]
    Session(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Closed classification of a streaming failure, produced once where the
/// failure happens (connect, read, status check, or protocol event).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFailure {
    /// Connection-level failure; the only retryable class.
    #[error("network error ({kind}): {message}")]
    Network { kind: NetworkKind, message: String },

    /// The attempt was cancelled by the caller.
    #[error("stream aborted")]
    Aborted,

    /// The backend answered the stream request with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The backend signalled a failure inside the stream.
    #[error("{message}")]
    Protocol { message: String },
}

impl StreamFailure {
    /// Builds a network failure of the given kind.
    pub fn network(kind: NetworkKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    /// Whether a fresh attempt may recover from this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Network failure categories recognized as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NetworkKind {
    ConnectionRefused,
    ConnectionReset,
    NameResolution,
    /// The request never produced a response (the browser's "failed to fetch").
    FailedToFetch,
    /// Generic network error without a more specific cause.
    Other,
}

impl NetworkKind {
    /// Maps an I/O error kind found in a transport error's source chain.
    pub fn from_io_kind(kind: std::io::ErrorKind) -> Self {
        use std::io::ErrorKind;

        match kind {
            ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => Self::ConnectionReset,
            ErrorKind::NotConnected | ErrorKind::AddrNotAvailable => Self::FailedToFetch,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_retry() {
        assert!(StreamFailure::network(NetworkKind::ConnectionReset, "reset").is_retryable());
        assert!(!StreamFailure::Aborted.is_retryable());
        assert!(
            !StreamFailure::Http {
                status: 502,
                body: "bad gateway".into()
            }
            .is_retryable()
        );
        assert!(
            !StreamFailure::Protocol {
                message: "rate limited".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_kinds_map_to_network_kinds() {
        use std::io::ErrorKind;

        assert_eq!(
            NetworkKind::from_io_kind(ErrorKind::ConnectionRefused),
            NetworkKind::ConnectionRefused
        );
        assert_eq!(
            NetworkKind::from_io_kind(ErrorKind::BrokenPipe),
            NetworkKind::ConnectionReset
        );
        assert_eq!(NetworkKind::from_io_kind(ErrorKind::Other), NetworkKind::Other);
    }

    #[test]
    fn http_failure_displays_status_and_body() {
        let err = StreamFailure::Http {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");

        let wrapped: RippleError = err.into();
        assert_eq!(wrapped.to_string(), "HTTP 500: boom");
    }
}
