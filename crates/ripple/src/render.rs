// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns store snapshots into terminal output.

use colored::Colorize;
use ripple_core::{ConnectionStatus, Message, Role};
use ripple_store::StoreState;

/// Incrementally prints the reply that is being streamed.
#[derive(Debug, Default)]
pub struct ReplyPrinter {
    message_id: Option<String>,
    printed: usize,
    tools_printed: usize,
    last_notice: Option<String>,
}

impl ReplyPrinter {
    /// Text of the followed reply not yet printed.
    ///
    /// Follows `streaming_message_id` while it is set and keeps following
    /// the same message afterwards so the final chunk is not lost.
    pub fn next_chunk(&mut self, state: &StoreState) -> Option<String> {
        if let Some(id) = &state.streaming_message_id
            && self.message_id.as_ref() != Some(id)
        {
            self.message_id = Some(id.clone());
            self.printed = 0;
            self.tools_printed = 0;
        }
        let message = state.message(self.message_id.as_deref()?)?;

        let mut out = String::new();
        let text = message.content.text();
        if text.len() > self.printed && text.is_char_boundary(self.printed) {
            out.push_str(&text[self.printed..]);
            self.printed = text.len();
        }
        for call in message.content.tool_calls().iter().skip(self.tools_printed) {
            out.push_str(&format!("\n{}\n", format!("[tool {}]", call.name).cyan()));
        }
        self.tools_printed = message.content.tool_calls().len();

        (!out.is_empty()).then_some(out)
    }

    /// Reconnection notice to show once per retry.
    pub fn notice(&mut self, state: &StoreState) -> Option<String> {
        if state.connection_status != ConnectionStatus::Reconnecting {
            return None;
        }
        let error = state.error.as_ref()?;
        if self.last_notice.as_ref() == Some(error) {
            return None;
        }
        self.last_notice = Some(error.clone());
        Some(error.clone())
    }
}

/// One stored message as a history line.
pub fn format_message(message: &Message) -> String {
    let role = match message.role {
        Role::User => "you".green().bold(),
        Role::Assistant => "agent".blue().bold(),
        other => other.to_string().dimmed(),
    };
    let mut line = format!("{role} {}", message.content.text());
    for call in message.content.tool_calls() {
        line.push_str(&format!(" {}", format!("[tool {}]", call.name).cyan()));
    }
    if let Some(rating) = message.feedback_rating {
        line.push_str(&format!(" {}", format!("({rating})").dimmed()));
    }
    format!("{line} {}", message.id.dimmed())
}
