// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message accumulator of ordered content blocks.

use ripple_core::{ContentBlock, MessageContent, ToolCall};

/// Append-only block list for the message currently being streamed.
///
/// Every [`snapshot`](AssemblyBuffer::snapshot) rebuilds the flattened text
/// and tool-call list from the blocks, so readers never see one without the
/// other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyBuffer {
    blocks: Vec<ContentBlock>,
}

impl AssemblyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from already-existing content (e.g. the seed of `message_created`).
    pub fn seeded(content: MessageContent) -> Self {
        Self {
            blocks: content.into_blocks(),
        }
    }

    /// Appends text, extending the last block when it is also text.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(ContentBlock::Text { text: last }) = self.blocks.last_mut() {
            last.push_str(text);
        } else {
            self.blocks.push(ContentBlock::Text {
                text: text.to_string(),
            });
        }
    }

    /// Appends a tool call as its own block. Tool calls are never merged.
    pub fn push_tool_call(&mut self, tool_call: ToolCall) {
        self.blocks.push(ContentBlock::ToolCall { tool_call });
    }

    /// Replaces everything with authoritative content from the server.
    pub fn replace(&mut self, content: MessageContent) {
        self.blocks = content.into_blocks();
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn snapshot(&self) -> MessageContent {
        MessageContent::from_blocks(self.blocks.clone())
    }
}
