// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for SSE frames as the chat backend writes them.

use serde_json::{Value, json};

/// One `event:` + `data:` frame terminated by a blank line.
pub fn event(event: &str, data: Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

pub fn message_created(id: &str, session_id: &str, role: &str, content: &str) -> String {
    event(
        "message_created",
        json!({
            "id": id,
            "session_id": session_id,
            "type": role,
            "content": content,
            "created_at": "2026-01-01T00:00:00Z",
        }),
    )
}

pub fn text_block(text: &str) -> String {
    event("content_block", json!({"type": "text", "text": text}))
}

pub fn tool_block(id: &str, name: &str, arguments: &str) -> String {
    event(
        "content_block",
        json!({"type": "tool_call", "tool_call": {"id": id, "name": name, "arguments": arguments}}),
    )
}

pub fn message_completed(status: &str) -> String {
    event("message_completed", json!({"status": status}))
}

pub fn error_event(message: &str) -> String {
    event("error", json!({"error": message}))
}

pub fn done() -> String {
    event("done", json!({}))
}

/// A legacy unnamed `data:` frame carrying incremental text.
pub fn legacy_text(text: &str) -> String {
    format!("data: {}\n\n", json!({"content": text}))
}
