// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`SessionProvider`].

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ripple_core::{RippleError, Session, SessionProvider};

/// Session collaborator that hands out `session-<n>` ids.
#[derive(Debug)]
pub struct MockSessions {
    current: Mutex<Option<String>>,
    agent_id: String,
    created: AtomicUsize,
    fail_creation: bool,
}

impl MockSessions {
    /// No session selected; agent `default`.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            agent_id: "default".to_string(),
            created: AtomicUsize::new(0),
            fail_creation: false,
        }
    }

    /// Starts with `session_id` already selected.
    pub fn with_current(session_id: &str) -> Self {
        let sessions = Self::new();
        sessions.set_current_session(Some(session_id.to_string()));
        sessions
    }

    /// Makes `create_session` fail.
    pub fn failing() -> Self {
        Self {
            fail_creation: true,
            ..Self::new()
        }
    }

    /// Number of sessions created so far.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Default for MockSessions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionProvider for MockSessions {
    fn current_session_id(&self) -> Option<String> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    fn set_current_session(&self, session_id: Option<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = session_id;
        }
    }

    fn current_agent_id(&self) -> String {
        self.agent_id.clone()
    }

    async fn create_session(&self, title: Option<&str>) -> Result<Session, RippleError> {
        if self.fail_creation {
            return Err(RippleError::Session("session backend unavailable".into()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Session {
            id: format!("session-{n}"),
            title: title.unwrap_or("New session").to_string(),
            created_at: None,
            updated_at: None,
        };
        self.set_current_session(Some(session.id.clone()));
        Ok(session)
    }
}
