// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ripple shell` command implementation.
//!
//! Interactive REPL with a colored prompt and readline history. Each line
//! is streamed to the current session; Ctrl-C during a reply cancels it.

use colored::Colorize;
use ripple_core::{RippleError, SessionProvider};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::Client;
use crate::render::format_message;
use crate::send::stream_reply;

/// A parsed REPL line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    Help,
    /// Drop the session selection; the next message starts a new session.
    New,
    Session(&'a str),
    History,
    /// Send over the non-streaming endpoint.
    Plain(&'a str),
    Send(&'a str),
    Unknown(&'a str),
}

fn parse(line: &str) -> Option<Command<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Some(Command::Send(trimmed));
    };
    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((rest, ""));
    Some(match (name, arg) {
        ("quit" | "exit", _) => Command::Quit,
        ("help", _) => Command::Help,
        ("new", _) => Command::New,
        ("session", id) if !id.is_empty() => Command::Session(id),
        ("history", _) => Command::History,
        ("plain", text) if !text.is_empty() => Command::Plain(text),
        _ => Command::Unknown(trimmed),
    })
}

/// Runs the REPL until `/quit`, Ctrl-C at the prompt or Ctrl-D.
pub async fn run_shell(client: &Client) -> Result<(), RippleError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| RippleError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "ripple shell".bold().green());
    println!("Type {} to exit, {} for commands.\n", "/quit".yellow(), "/help".yellow());

    let prompt = format!("{}> ", "ripple".green());
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };
        let Some(command) = parse(&line) else {
            continue;
        };
        let _ = rl.add_history_entry(line.as_str());

        if command == Command::Quit {
            break;
        }
        if let Err(e) = handle(client, command).await {
            eprintln!("{}: {e}", "error".red());
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn handle(client: &Client, command: Command<'_>) -> Result<(), RippleError> {
    let store = &client.store;
    match command {
        Command::Quit => {}
        Command::Help => print_help(),
        Command::New => {
            client.sessions.set_current_session(None);
            println!("{}", "next message starts a new session".dimmed());
        }
        Command::Session(id) => {
            store.switch_session(id).await?;
            for message in store.current_messages() {
                println!("{}", format_message(&message));
            }
        }
        Command::History => {
            for message in store.current_messages() {
                println!("{}", format_message(&message));
            }
        }
        Command::Plain(text) => {
            let reply = store.send_message_non_streaming(text).await?;
            println!("{}", reply.content.text());
        }
        Command::Send(text) => {
            stream_reply(store, text, None).await?;
        }
        Command::Unknown(line) => {
            eprintln!("{} {line}", "unknown command:".yellow());
        }
    }
    Ok(())
}

fn print_help() {
    println!("  /new            start a new session with the next message");
    println!("  /session <id>   switch to a session and show its messages");
    println!("  /history        show the messages of the current session");
    println!("  /plain <text>   send without streaming");
    println!("  /quit           exit");
}
