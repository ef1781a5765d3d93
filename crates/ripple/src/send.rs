// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ripple send` command implementation.

use std::io::Write;

use colored::Colorize;
use ripple_core::RippleError;
use ripple_store::{ChatStore, SendOutcome};
use tracing::debug;

use crate::render::ReplyPrinter;

/// Sends one message and streams the reply to stdout until it finishes.
pub async fn run_send(
    store: &ChatStore,
    text: &str,
    directory: Option<&str>,
) -> Result<(), RippleError> {
    let outcome = stream_reply(store, text, directory).await?;
    if outcome == SendOutcome::Cancelled {
        eprintln!("{}", "cancelled".yellow());
    }
    Ok(())
}

/// Drives `send_message` while echoing every state change. Ctrl-C cancels
/// the stream instead of killing the process.
pub async fn stream_reply(
    store: &ChatStore,
    text: &str,
    directory: Option<&str>,
) -> Result<SendOutcome, RippleError> {
    let mut rx = store.subscribe();
    let mut printer = ReplyPrinter::default();

    let send = store.send_message(text, directory);
    tokio::pin!(send);
    let mut interrupt = std::pin::pin!(tokio::signal::ctrl_c());
    let mut interrupted = false;

    let result = loop {
        tokio::select! {
            result = &mut send => break result,
            changed = rx.changed() => {
                if changed.is_err() {
                    break send.await;
                }
                let state = rx.borrow_and_update().clone();
                echo(&mut printer, &state);
            }
            _ = &mut interrupt, if !interrupted => {
                debug!("interrupt received, cancelling stream");
                interrupted = true;
                store.cancel_streaming();
            }
        }
    };

    echo(&mut printer, &store.snapshot());
    println!();
    result
}

fn echo(printer: &mut ReplyPrinter, state: &ripple_store::StoreState) {
    if let Some(notice) = printer.notice(state) {
        eprintln!("\n{}", notice.dimmed());
    }
    if let Some(chunk) = printer.next_chunk(state) {
        print!("{chunk}");
        let _ = std::io::stdout().flush();
    }
}
