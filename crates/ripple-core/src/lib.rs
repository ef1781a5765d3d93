// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ripple chat client.
//!
//! This crate provides the domain types (messages, content blocks, tool
//! calls), the error types, and the collaborator traits implemented by the
//! HTTP layer and by the test doubles.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{NetworkKind, RippleError, StreamFailure};
pub use traits::{ByteStream, ChatTransport, SessionProvider};
pub use types::{
    ChatRequest, ConnectionStatus, ContentBlock, FeedbackRating, FeedbackRecord, FeedbackRequest,
    Message, MessageContent, MessageStatus, Role, Session, StreamChatRequest, ToolCall,
};
