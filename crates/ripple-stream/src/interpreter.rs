// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps decoded SSE records to message-collection effects.
//!
//! The [`Interpreter`] owns the assembly buffer of the active streaming
//! target and survives reconnect attempts, so a resumed stream keeps
//! growing the same content instead of starting over. It never touches the
//! collection itself: every record turns into a list of [`Effect`]s that the
//! store applies under its own lock.

use ripple_config::ProtocolVariant;
use ripple_core::{Message, MessageContent, MessageStatus, Role, ToolCall};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::assembly::AssemblyBuffer;
use crate::sse::SseRecord;

/// A mutation of the message collection requested by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Insert the message unless its id is already present.
    Insert(Message),
    /// Replace the content of a non-terminal message.
    Content { id: String, content: MessageContent },
    /// Move a non-terminal message to `status`.
    Status { id: String, status: MessageStatus },
    /// Surface a business error in the store.
    Error(String),
}

/// What the reader should do after a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The backend signalled the end of the reply.
    Done,
    /// The backend signalled a failure; stop reading immediately.
    Failed,
}

/// Effects of one record plus the resulting flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub effects: Vec<Effect>,
    pub flow: Flow,
}

impl Step {
    fn proceed(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            flow: Flow::Continue,
        }
    }

    fn skip() -> Self {
        Self::proceed(Vec::new())
    }
}

/// Vocabulary the interpreter has committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Rich,
    Legacy,
}

impl Dialect {
    /// Classifies an event type; `None` for types shared by both (or unknown).
    fn of_event(event: &str) -> Option<Self> {
        match event {
            "message_created" | "content_block" | "message_completed" | "error" => Some(Self::Rich),
            "message" | "tool_call" | "" => Some(Self::Legacy),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockEvent {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolCall {
        tool_call: ToolCall,
    },
}

#[derive(Debug, Deserialize)]
struct CompletedEvent {
    #[serde(default)]
    status: Option<MessageStatus>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Stateful record interpreter for one user-initiated send.
#[derive(Debug)]
pub struct Interpreter {
    configured: ProtocolVariant,
    dialect: Option<Dialect>,
    session_id: String,
    user_text: String,
    target: Option<String>,
    buffer: AssemblyBuffer,
    placeholders_created: bool,
    /// The target lost its connection and has not received anything since.
    interrupted: bool,
}

impl Interpreter {
    pub fn new(
        variant: ProtocolVariant,
        session_id: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        let dialect = match variant {
            ProtocolVariant::Rich => Some(Dialect::Rich),
            ProtocolVariant::Legacy => Some(Dialect::Legacy),
            ProtocolVariant::Auto => None,
        };
        Self {
            configured: variant,
            dialect,
            session_id: session_id.into(),
            user_text: user_text.into(),
            target: None,
            buffer: AssemblyBuffer::new(),
            placeholders_created: false,
            interrupted: false,
        }
    }

    /// The variant this interpreter was configured with.
    pub fn configured_variant(&self) -> ProtocolVariant {
        self.configured
    }

    /// Id of the assistant message currently receiving content.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Effects to apply before the first attempt opens its stream.
    ///
    /// In legacy mode the client owns both messages of the exchange.
    pub fn start(&mut self) -> Vec<Effect> {
        match self.dialect {
            Some(Dialect::Legacy) => self.create_placeholders(),
            _ => Vec::new(),
        }
    }

    /// Interprets one record.
    pub fn apply(&mut self, record: SseRecord) -> Step {
        let mut effects = Vec::new();

        if self.dialect.is_none()
            && let Some(dialect) = Dialect::of_event(&record.event)
        {
            debug!(?dialect, event = %record.event, "detected stream protocol");
            self.dialect = Some(dialect);
            if dialect == Dialect::Legacy {
                effects.extend(self.create_placeholders());
            }
        }

        let mut step = match (record.event.as_str(), self.dialect) {
            ("done", _) => self.on_done(),
            ("error", _) => self.on_error(&record.data),
            ("message_created", Some(Dialect::Rich)) => self.on_message_created(record.data),
            ("content_block", Some(Dialect::Rich)) => self.on_content_block(record.data),
            ("message_completed", Some(Dialect::Rich)) => self.on_message_completed(record.data),
            ("message" | "", Some(Dialect::Legacy)) => self.on_legacy_message(&record.data),
            ("tool_call", Some(Dialect::Legacy)) => self.on_legacy_tool_call(record.data),
            (event, _) => {
                debug!(event, "ignoring record");
                Step::skip()
            }
        };

        if self.interrupted
            && step.effects.iter().any(|e| {
                matches!(e, Effect::Content { id, .. } if self.target.as_deref() == Some(id.as_str()))
            })
        {
            self.interrupted = false;
        }

        effects.append(&mut step.effects);
        step.effects = effects;
        step
    }

    /// Records that the current attempt broke off and will be reissued.
    ///
    /// If the resumed stream announces a different assistant message, the
    /// interrupted one is failed rather than completed.
    pub fn interrupt(&mut self) {
        self.interrupted = self.target.is_some();
    }

    /// Effects for a stream that ended without an error.
    pub fn finish(&mut self) -> Vec<Effect> {
        self.target
            .take()
            .map(|id| {
                vec![Effect::Status {
                    id,
                    status: MessageStatus::Completed,
                }]
            })
            .unwrap_or_default()
    }

    /// Effects for a stream that ended in an unrecoverable failure.
    pub fn fail(&mut self) -> Vec<Effect> {
        self.target
            .take()
            .map(|id| {
                vec![Effect::Status {
                    id,
                    status: MessageStatus::Failed,
                }]
            })
            .unwrap_or_default()
    }

    fn create_placeholders(&mut self) -> Vec<Effect> {
        if self.placeholders_created {
            return Vec::new();
        }
        self.placeholders_created = true;

        let now = chrono::Utc::now().to_rfc3339();
        let local_id = uuid::Uuid::new_v4();
        let user = Message::new(format!("local-{local_id}-user"), &self.session_id, Role::User)
            .with_content(MessageContent::from_text(self.user_text.clone()))
            .with_created_at(now.clone());
        let assistant = Message::new(
            format!("local-{local_id}-assistant"),
            &self.session_id,
            Role::Assistant,
        )
        .with_status(MessageStatus::Streaming)
        .with_created_at(now);

        self.target = Some(assistant.id.clone());
        self.buffer = AssemblyBuffer::new();
        vec![Effect::Insert(user), Effect::Insert(assistant)]
    }

    fn on_message_created(&mut self, data: Value) -> Step {
        let seed = data.get("content").map(seed_content).unwrap_or_default();
        let mut message: Message = match serde_json::from_value(data) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "ignoring malformed message_created");
                return Step::skip();
            }
        };

        if message.role != Role::Assistant {
            return Step::proceed(vec![Effect::Insert(message)]);
        }

        // The reply is streaming until the backend says otherwise.
        message.status = MessageStatus::Streaming;
        let mut effects = Vec::new();
        if self.target.as_deref() != Some(message.id.as_str()) {
            if let Some(previous) = self.target.take() {
                let status = if self.interrupted {
                    MessageStatus::Failed
                } else {
                    MessageStatus::Completed
                };
                debug!(previous = %previous, next = %message.id, %status, "assistant message superseded");
                effects.push(Effect::Status {
                    id: previous,
                    status,
                });
            }
            self.buffer = AssemblyBuffer::seeded(seed);
            self.target = Some(message.id.clone());
        }
        message.content = self.buffer.snapshot();

        effects.extend([
            Effect::Insert(message.clone()),
            Effect::Status {
                id: message.id.clone(),
                status: MessageStatus::Streaming,
            },
            Effect::Content {
                id: message.id,
                content: self.buffer.snapshot(),
            },
        ]);
        Step::proceed(effects)
    }

    fn on_content_block(&mut self, data: Value) -> Step {
        let Some(id) = self.target.clone() else {
            debug!("content_block without an active message");
            return Step::skip();
        };
        match serde_json::from_value::<ContentBlockEvent>(data) {
            Ok(ContentBlockEvent::Text { text }) => {
                if text.is_empty() {
                    return Step::skip();
                }
                self.buffer.push_text(&text);
            }
            Ok(ContentBlockEvent::ToolCall { tool_call }) => self.buffer.push_tool_call(tool_call),
            Err(e) => {
                debug!(error = %e, "ignoring unrecognized content_block");
                return Step::skip();
            }
        }
        Step::proceed(vec![Effect::Content {
            id,
            content: self.buffer.snapshot(),
        }])
    }

    fn on_message_completed(&mut self, data: Value) -> Step {
        let Some(id) = self.target.take() else {
            debug!("message_completed without an active message");
            return Step::skip();
        };
        let event: CompletedEvent = match serde_json::from_value(data) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "malformed message_completed, completing anyway");
                CompletedEvent {
                    status: None,
                    content: None,
                    error: None,
                }
            }
        };

        let mut effects = Vec::new();
        if let Some(raw) = event.content.as_ref().filter(|c| !c.is_null()) {
            self.buffer.replace(seed_content(raw));
            effects.push(Effect::Content {
                id: id.clone(),
                content: self.buffer.snapshot(),
            });
        }

        let status = event
            .status
            .filter(|s| s.is_terminal())
            .unwrap_or(MessageStatus::Completed);
        if status == MessageStatus::Failed
            && let Some(error) = event.error
        {
            effects.push(Effect::Error(error));
        }
        effects.push(Effect::Status { id, status });
        Step::proceed(effects)
    }

    fn on_error(&mut self, data: &Value) -> Step {
        let message = data
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("stream error")
            .to_string();
        warn!(error = %message, "backend reported a stream error");
        let mut effects = vec![Effect::Error(message)];
        effects.extend(self.fail());
        Step {
            effects,
            flow: Flow::Failed,
        }
    }

    fn on_done(&mut self) -> Step {
        Step {
            effects: self.finish(),
            flow: Flow::Done,
        }
    }

    fn on_legacy_message(&mut self, data: &Value) -> Step {
        if data.get("error").is_some_and(|e| !e.is_null()) {
            return self.on_error(data);
        }
        let Some(id) = self.target.clone() else {
            return Step::skip();
        };

        let mut changed = false;
        if let Some(text) = data.get("content").and_then(Value::as_str)
            && !text.is_empty()
        {
            self.buffer.push_text(text);
            changed = true;
        }
        if data.get("name").is_some()
            && let Ok(tool_call) = serde_json::from_value::<ToolCall>(data.clone())
        {
            self.buffer.push_tool_call(tool_call);
            changed = true;
        }

        if !changed {
            return Step::skip();
        }
        Step::proceed(vec![Effect::Content {
            id,
            content: self.buffer.snapshot(),
        }])
    }

    fn on_legacy_tool_call(&mut self, data: Value) -> Step {
        let Some(id) = self.target.clone() else {
            return Step::skip();
        };
        match serde_json::from_value::<ToolCall>(data) {
            Ok(tool_call) => {
                self.buffer.push_tool_call(tool_call);
                Step::proceed(vec![Effect::Content {
                    id,
                    content: self.buffer.snapshot(),
                }])
            }
            Err(e) => {
                debug!(error = %e, "ignoring malformed tool_call");
                Step::skip()
            }
        }
    }
}

/// Parses server-provided content, starting empty when it is not structured.
fn seed_content(raw: &Value) -> MessageContent {
    let parsed = match raw {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(value @ Value::Object(_)) => value,
            _ => return MessageContent::default(),
        },
        value @ Value::Object(_) => value.clone(),
        _ => return MessageContent::default(),
    };
    serde_json::from_value(parsed).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(event: &str, data: Value) -> SseRecord {
        SseRecord {
            event: event.to_string(),
            data,
        }
    }

    fn last_content(step: &Step) -> &MessageContent {
        step.effects
            .iter()
            .rev()
            .find_map(|e| match e {
                Effect::Content { content, .. } => Some(content),
                _ => None,
            })
            .expect("content effect")
    }

    fn created(id: &str, role: &str, content: &str) -> SseRecord {
        record(
            "message_created",
            json!({"id": id, "session_id": "s1", "type": role, "content": content, "created_at": "t"}),
        )
    }

    #[test]
    fn rich_stream_assembles_text_and_tools() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        assert!(it.start().is_empty());

        let step = it.apply(created("u1", "user", "hi"));
        assert!(matches!(&step.effects[..], [Effect::Insert(m)] if m.role == Role::User && m.content.text() == "hi"));
        assert!(it.target().is_none());

        let step = it.apply(created("a1", "assistant", ""));
        assert!(matches!(&step.effects[0], Effect::Insert(m) if m.status == MessageStatus::Streaming));
        assert_eq!(it.target(), Some("a1"));

        it.apply(record("content_block", json!({"type": "text", "text": "Let me "})));
        it.apply(record(
            "content_block",
            json!({"type": "tool_call", "tool_call": {"id": "c1", "name": "ls", "arguments": "{}"}}),
        ));
        let step = it.apply(record("content_block", json!({"type": "text", "text": "check"})));
        let content = last_content(&step);
        assert_eq!(content.text(), "Let me check");
        assert_eq!(content.blocks().len(), 3);
        assert_eq!(content.tool_calls()[0].name, "ls");

        let step = it.apply(record("message_completed", json!({"status": "completed"})));
        assert_eq!(
            step.effects,
            vec![Effect::Status {
                id: "a1".into(),
                status: MessageStatus::Completed
            }]
        );
        assert!(it.target().is_none());
    }

    #[test]
    fn assistant_seed_parses_structured_content_only() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", r#"{"text":"seed"}"#));
        let step = it.apply(record("content_block", json!({"type": "text", "text": "!"})));
        assert_eq!(last_content(&step).text(), "seed!");

        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a2", "assistant", "not json"));
        let step = it.apply(record("content_block", json!({"type": "text", "text": "x"})));
        assert_eq!(last_content(&step).text(), "x");
    }

    #[test]
    fn repeated_message_created_keeps_buffer() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", ""));
        it.apply(record("content_block", json!({"type": "text", "text": "abc"})));
        let step = it.apply(created("a1", "assistant", ""));
        assert_eq!(last_content(&step).text(), "abc");
    }

    #[test]
    fn next_assistant_message_completes_the_previous_one() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", ""));
        it.apply(record("content_block", json!({"type": "text", "text": "first"})));

        let step = it.apply(created("a2", "assistant", ""));
        assert_eq!(
            step.effects[0],
            Effect::Status {
                id: "a1".into(),
                status: MessageStatus::Completed
            }
        );
        assert_eq!(it.target(), Some("a2"));
        assert_eq!(last_content(&step).text(), "");
    }

    #[test]
    fn interrupted_message_fails_when_resume_announces_another() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", ""));
        it.apply(record("content_block", json!({"type": "text", "text": "Hel"})));
        it.interrupt();

        // A replayed user message does not count as resumed output.
        it.apply(created("u1", "user", "hi"));
        let step = it.apply(created("a2", "assistant", ""));
        assert_eq!(
            step.effects[0],
            Effect::Status {
                id: "a1".into(),
                status: MessageStatus::Failed
            }
        );
    }

    #[test]
    fn resumed_output_clears_interruption() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", ""));
        it.interrupt();
        it.apply(record("content_block", json!({"type": "text", "text": "more"})));

        let step = it.apply(created("a2", "assistant", ""));
        assert_eq!(
            step.effects[0],
            Effect::Status {
                id: "a1".into(),
                status: MessageStatus::Completed
            }
        );
    }

    #[test]
    fn error_event_fails_target_and_stops() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", ""));
        let step = it.apply(record("error", json!({"error": "rate limited"})));
        assert_eq!(step.flow, Flow::Failed);
        assert_eq!(
            step.effects,
            vec![
                Effect::Error("rate limited".into()),
                Effect::Status {
                    id: "a1".into(),
                    status: MessageStatus::Failed
                }
            ]
        );
    }

    #[test]
    fn failed_completion_surfaces_error() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", ""));
        let step = it.apply(record(
            "message_completed",
            json!({"status": "failed", "error": "tool crashed"}),
        ));
        assert!(step.effects.contains(&Effect::Error("tool crashed".into())));
        assert!(step.effects.contains(&Effect::Status {
            id: "a1".into(),
            status: MessageStatus::Failed
        }));
    }

    #[test]
    fn completion_content_is_authoritative() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        it.apply(created("a1", "assistant", ""));
        it.apply(record("content_block", json!({"type": "text", "text": "draft"})));
        let step = it.apply(record(
            "message_completed",
            json!({"status": "completed", "content": "{\"text\":\"final\"}"}),
        ));
        assert_eq!(last_content(&step).text(), "final");
    }

    #[test]
    fn legacy_creates_messages_once() {
        let mut it = Interpreter::new(ProtocolVariant::Legacy, "s1", "hello");
        let effects = it.start();
        assert_eq!(effects.len(), 2);
        assert!(matches!(&effects[0], Effect::Insert(m) if m.role == Role::User && m.content.text() == "hello"));
        assert!(matches!(&effects[1], Effect::Insert(m) if m.status == MessageStatus::Streaming));
        assert!(it.start().is_empty());

        it.apply(record("message", json!({"content": "Hi "})));
        it.apply(record("tool_call", json!({"id": "t", "name": "date", "arguments": {}})));
        let step = it.apply(record("message", json!({"content": "there"})));
        let content = last_content(&step);
        assert_eq!(content.text(), "Hi there");
        assert_eq!(content.tool_calls()[0].arguments, "{}");

        let step = it.apply(record("done", json!({})));
        assert_eq!(step.flow, Flow::Done);
        assert!(matches!(&step.effects[..], [Effect::Status { status: MessageStatus::Completed, .. }]));
    }

    #[test]
    fn legacy_error_payload_is_fatal() {
        let mut it = Interpreter::new(ProtocolVariant::Legacy, "s1", "hello");
        it.start();
        let step = it.apply(record("message", json!({"error": "boom"})));
        assert_eq!(step.flow, Flow::Failed);
        assert_eq!(step.effects[0], Effect::Error("boom".into()));
    }

    #[test]
    fn auto_detects_legacy_from_unnamed_records() {
        let mut it = Interpreter::new(ProtocolVariant::Auto, "s1", "hello");
        assert!(it.start().is_empty());
        let step = it.apply(record("", json!({"content": "yo"})));
        assert_eq!(step.effects.len(), 3);
        assert_eq!(last_content(&step).text(), "yo");
    }

    #[test]
    fn auto_detects_rich_without_placeholders() {
        let mut it = Interpreter::new(ProtocolVariant::Auto, "s1", "hello");
        let step = it.apply(created("u1", "user", "hello"));
        assert_eq!(step.effects.len(), 1);
        // Once rich, unnamed records are not legacy text.
        let step = it.apply(record("", json!({"content": "stray"})));
        assert!(step.effects.is_empty());
    }

    #[test]
    fn content_without_target_is_dropped() {
        let mut it = Interpreter::new(ProtocolVariant::Rich, "s1", "hi");
        let step = it.apply(record("content_block", json!({"type": "text", "text": "lost"})));
        assert!(step.effects.is_empty());
    }
}
