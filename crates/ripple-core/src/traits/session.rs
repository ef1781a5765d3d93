// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session collaborator trait.

use async_trait::async_trait;

use crate::error::RippleError;
use crate::types::Session;

/// The slice of session/agent management the chat store depends on.
///
/// Accessors are synchronous; implementations keep the current selection
/// behind their own interior mutability.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    /// The session new messages belong to, if one is selected.
    fn current_session_id(&self) -> Option<String>;

    /// Selects (or clears) the current session.
    fn set_current_session(&self, session_id: Option<String>);

    /// The agent that answers new messages.
    fn current_agent_id(&self) -> String;

    /// Creates a session and makes it current.
    async fn create_session(&self, title: Option<&str>) -> Result<Session, RippleError>;
}
