// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the stream engine, the transport, and the store.
//!
//! Message content is a typed [`MessageContent`] in memory. It only becomes
//! a JSON string at the wire boundary (see [`MessageContent::to_wire`] and
//! [`MessageContent::from_wire`]).

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Who authored a message. The backend calls this field `type`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// Lifecycle status of a message.
///
/// `Streaming` may move to `Completed` or `Failed`; both are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    #[serde(alias = "sending")]
    Streaming,
    #[default]
    Completed,
    Failed,
}

impl MessageStatus {
    /// Returns true once no further mutation may touch the message.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Connection state of the store's streaming channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// A tool invocation requested by the assistant.
///
/// `arguments` is opaque: it is stored exactly as the backend delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl Serialize for ToolCall {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Function<'a> {
            name: &'a str,
            arguments: &'a str,
        }

        #[derive(Serialize)]
        struct Wire<'a> {
            id: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            function: Function<'a>,
        }

        Wire {
            id: &self.id,
            kind: "function",
            function: Function {
                name: &self.name,
                arguments: &self.arguments,
            },
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ToolCall {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Function {
            name: String,
            #[serde(default)]
            arguments: Arguments,
        }

        // Stored content uses the OpenAI shape; stream events use the flat one.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Nested {
                #[serde(default)]
                id: String,
                function: Function,
            },
            Flat {
                #[serde(default)]
                id: String,
                name: String,
                #[serde(default)]
                arguments: Arguments,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Nested { id, function } => ToolCall {
                id,
                name: function.name,
                arguments: function.arguments.0,
            },
            Wire::Flat {
                id,
                name,
                arguments,
            } => ToolCall {
                id,
                name,
                arguments: arguments.0,
            },
        })
    }
}

/// Tool arguments as delivered: strings pass through, other JSON is re-encoded.
#[derive(Debug, Default)]
struct Arguments(String);

impl<'de> Deserialize<'de> for Arguments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Arguments(s),
            Value::Null => Arguments(String::new()),
            other => Arguments(other.to_string()),
        })
    }
}

/// One ordered unit of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolCall { tool_call: ToolCall },
}

/// Renderable message content: ordered blocks plus the flattened views.
///
/// `text` is always the concatenation of the text blocks and `tool_calls`
/// always mirrors the tool-call blocks. The only constructors derive both
/// from the block list, so the invariant cannot be broken from outside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageContent {
    blocks: Vec<ContentBlock>,
    text: String,
    tool_calls: Vec<ToolCall>,
}

impl MessageContent {
    /// Builds content from an ordered block list, deriving the flat fields.
    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in &blocks {
            match block {
                ContentBlock::Text { text: t } => text.push_str(t),
                ContentBlock::ToolCall { tool_call } => tool_calls.push(tool_call.clone()),
            }
        }
        Self {
            blocks,
            text,
            tool_calls,
        }
    }

    /// Content holding a single text run (no blocks at all when empty).
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self::from_blocks(vec![ContentBlock::Text { text }])
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Consumes the content, returning its block list.
    pub fn into_blocks(self) -> Vec<ContentBlock> {
        self.blocks
    }

    /// Serializes to the JSON string stored in `Message.content` on the wire.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses a wire content string, normalizing every accepted shape.
    ///
    /// Anything that is not a JSON object is taken as plain text.
    pub fn from_wire(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => Self::from_value(value),
            _ => Self::from_text(raw),
        }
    }

    fn from_value(value: Value) -> Self {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            blocks: Option<Vec<ContentBlock>>,
            #[serde(default)]
            text: Option<String>,
            #[serde(default)]
            tool_calls: Option<Vec<ToolCall>>,
        }

        match value {
            Value::Null => Self::default(),
            Value::String(s) => Self::from_wire(&s),
            Value::Object(_) => match serde_json::from_value::<Raw>(value.clone()) {
                Ok(Raw {
                    blocks: Some(blocks),
                    ..
                }) if !blocks.is_empty() => Self::from_blocks(blocks),
                Ok(raw) => {
                    let mut blocks = Vec::new();
                    if let Some(text) = raw.text.filter(|t| !t.is_empty()) {
                        blocks.push(ContentBlock::Text { text });
                    }
                    blocks.extend(
                        raw.tool_calls
                            .unwrap_or_default()
                            .into_iter()
                            .map(|tool_call| ContentBlock::ToolCall { tool_call }),
                    );
                    Self::from_blocks(blocks)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "unrecognized content object, keeping it as text");
                    Self::from_text(value.to_string())
                }
            },
            other => Self::from_text(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

/// Serde adapter that stores [`MessageContent`] as a JSON string.
mod wire_content {
    use super::*;

    pub fn serialize<S: Serializer>(content: &MessageContent, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&content.to_wire())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MessageContent, D::Error> {
        MessageContent::deserialize(deserializer)
    }
}

/// Accepts identifiers sent either as strings or as numbers.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Thumbs-up / thumbs-down feedback on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeedbackRating {
    Like,
    Dislike,
}

/// A chat message as held in the client-side collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(deserialize_with = "lenient_id")]
    pub session_id: String,
    #[serde(rename = "type", alias = "role")]
    pub role: Role,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, with = "wire_content")]
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_rating: Option<FeedbackRating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_at: Option<String>,
}

impl Message {
    /// Creates a completed message with empty content.
    pub fn new(id: impl Into<String>, session_id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            role,
            status: MessageStatus::Completed,
            created_at: String::new(),
            content: MessageContent::default(),
            feedback_rating: None,
            feedback_comment: None,
            feedback_at: None,
        }
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content = content;
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }
}

/// A chat session owned by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body of `POST {base}/chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamChatRequest {
    pub session_id: String,
    pub agent_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
}

/// Body of `POST {base}/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub agent_id: String,
    pub message: String,
}

/// Body of `POST {base}/messages/{id}/feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRequest {
    pub rating: FeedbackRating,
    pub comment: String,
}

/// Feedback fields echoed back by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub feedback_rating: Option<FeedbackRating>,
    #[serde(default)]
    pub feedback_comment: Option<String>,
    #[serde(default)]
    pub feedback_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(t: &str) -> ContentBlock {
        ContentBlock::Text { text: t.into() }
    }

    fn tool(id: &str) -> ContentBlock {
        ContentBlock::ToolCall {
            tool_call: ToolCall {
                id: id.into(),
                name: "bash".into(),
                arguments: "{\"cmd\":\"ls\"}".into(),
            },
        }
    }

    #[test]
    fn flat_fields_follow_blocks() {
        let content = MessageContent::from_blocks(vec![text("Hel"), tool("t1"), text("lo")]);
        assert_eq!(content.text(), "Hello");
        assert_eq!(content.tool_calls().len(), 1);
        assert_eq!(content.tool_calls()[0].id, "t1");
    }

    #[test]
    fn wire_object_with_blocks_is_authoritative() {
        let raw = r#"{"blocks":[{"type":"text","text":"a"},{"type":"text","text":"b"}],"text":"stale","tool_calls":[]}"#;
        let content = MessageContent::from_wire(raw);
        assert_eq!(content.text(), "ab");
        assert_eq!(content.blocks().len(), 2);
    }

    #[test]
    fn wire_object_without_blocks_is_converted() {
        let raw = r#"{"text":"hi","tool_calls":[{"id":"c1","type":"function","function":{"name":"grep","arguments":"{}"}}]}"#;
        let content = MessageContent::from_wire(raw);
        assert_eq!(content.text(), "hi");
        assert_eq!(content.blocks().len(), 2);
        assert!(matches!(&content.blocks()[0], ContentBlock::Text { text } if text == "hi"));
        assert_eq!(content.tool_calls()[0].name, "grep");
    }

    #[test]
    fn plain_string_becomes_text() {
        let content = MessageContent::from_wire("just words");
        assert_eq!(content.text(), "just words");
        assert_eq!(MessageContent::from_wire(""), MessageContent::default());
    }

    #[test]
    fn tool_call_accepts_flat_shape_and_emits_nested() {
        let call: ToolCall =
            serde_json::from_str(r#"{"id":"x","name":"read","arguments":{"path":"a.txt"}}"#)
                .unwrap();
        assert_eq!(call.arguments, r#"{"path":"a.txt"}"#);

        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "read");
    }

    #[test]
    fn message_reads_backend_shape() {
        let json = r#"{
            "id": 42,
            "session_id": "s1",
            "type": "assistant",
            "status": "sending",
            "created_at": "2026-01-01T00:00:00Z",
            "content": "{\"text\":\"hey\"}",
            "input_tokens": 3
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, "42");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.status, MessageStatus::Streaming);
        assert_eq!(msg.content.text(), "hey");
    }

    #[test]
    fn message_writes_content_as_string() {
        let msg = Message::new("m1", "s1", Role::User).with_content(MessageContent::from_text("yo"));
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["content"].is_string());
        assert_eq!(json["type"], "user");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!MessageStatus::Streaming.is_terminal());
        assert!(MessageStatus::Completed.is_terminal());
        assert!(MessageStatus::Failed.is_terminal());
    }

    proptest! {
        #[test]
        fn text_is_concatenation_of_text_blocks(parts in proptest::collection::vec(("[a-z ]{0,8}", any::<bool>()), 0..16)) {
            let blocks: Vec<ContentBlock> = parts
                .iter()
                .enumerate()
                .map(|(i, (t, is_tool))| if *is_tool { tool(&i.to_string()) } else { text(t) })
                .collect();
            let expected: String = parts.iter().filter(|(_, is_tool)| !is_tool).map(|(t, _)| t.as_str()).collect();

            let content = MessageContent::from_blocks(blocks);
            prop_assert_eq!(content.text(), expected.as_str());

            let reparsed = MessageContent::from_wire(&content.to_wire());
            prop_assert_eq!(reparsed.text(), expected.as_str());
        }
    }
}
