// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ripple history` and `ripple feedback` command implementations.

use colored::Colorize;
use ripple_core::{FeedbackRating, RippleError};
use ripple_store::ChatStore;

use crate::render::format_message;

/// Prints every stored message of `session_id`.
pub async fn run_history(store: &ChatStore, session_id: &str) -> Result<(), RippleError> {
    store.switch_session(session_id).await?;
    let messages = store.current_messages();
    if messages.is_empty() {
        println!("{}", "no messages".dimmed());
    }
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}

pub async fn run_feedback(
    store: &ChatStore,
    message_id: &str,
    rating: FeedbackRating,
    comment: &str,
) -> Result<(), RippleError> {
    if store.send_feedback(message_id, rating, comment).await {
        println!("{} {message_id}", format!("{rating} recorded for").green());
        Ok(())
    } else {
        Err(RippleError::Internal(format!(
            "feedback for message {message_id} was not accepted"
        )))
    }
}
