// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-backed [`SessionProvider`].

use std::sync::RwLock;

use async_trait::async_trait;
use ripple_core::{RippleError, Session, SessionProvider};
use tracing::info;

use crate::client::HttpTransport;
use crate::types::CreateSessionRequest;

const DEFAULT_SESSION_TITLE: &str = "New session";

#[derive(Debug, Default)]
struct Selection {
    session_id: Option<String>,
    agent_id: String,
}

/// Tracks the selected session/agent and creates sessions via `POST /sessions`.
#[derive(Debug)]
pub struct HttpSessions {
    transport: HttpTransport,
    selection: RwLock<Selection>,
}

impl HttpSessions {
    pub fn new(transport: HttpTransport, default_agent_id: impl Into<String>) -> Self {
        Self {
            transport,
            selection: RwLock::new(Selection {
                session_id: None,
                agent_id: default_agent_id.into(),
            }),
        }
    }

    pub fn set_current_agent(&self, agent_id: impl Into<String>) {
        if let Ok(mut selection) = self.selection.write() {
            selection.agent_id = agent_id.into();
        }
    }
}

#[async_trait]
impl SessionProvider for HttpSessions {
    fn current_session_id(&self) -> Option<String> {
        self.selection
            .read()
            .ok()
            .and_then(|s| s.session_id.clone())
    }

    fn set_current_session(&self, session_id: Option<String>) {
        if let Ok(mut selection) = self.selection.write() {
            selection.session_id = session_id;
        }
    }

    fn current_agent_id(&self) -> String {
        self.selection
            .read()
            .map(|s| s.agent_id.clone())
            .unwrap_or_default()
    }

    async fn create_session(&self, title: Option<&str>) -> Result<Session, RippleError> {
        let body = CreateSessionRequest {
            title: title.unwrap_or(DEFAULT_SESSION_TITLE),
        };
        let request = self
            .transport
            .client()
            .post(self.transport.url("/sessions"))
            .json(&body);
        let session: Session = self
            .transport
            .send_json(request)
            .await?
            .ok_or_else(|| RippleError::Session("backend returned no session".into()))?;

        info!(session_id = %session.id, "created session");
        self.set_current_session(Some(session.id.clone()));
        Ok(session)
    }
}
