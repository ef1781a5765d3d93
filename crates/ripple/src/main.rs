// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ripple - terminal client for a streaming agent chat backend.

mod history;
mod render;
mod send;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use ripple_config::RippleConfig;
use ripple_core::{FeedbackRating, RippleError, SessionProvider};
use ripple_http::{HttpSessions, HttpTransport};
use ripple_store::ChatStore;

/// Ripple - chat with an agent backend from the terminal.
#[derive(Parser, Debug)]
#[command(name = "ripple", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message and stream the reply to stdout.
    Send {
        text: String,
        /// Working directory the agent should operate in.
        #[arg(long)]
        dir: Option<String>,
        /// Continue an existing session instead of creating one.
        #[arg(long)]
        session: Option<String>,
    },
    /// Launch an interactive REPL session.
    Shell {
        #[arg(long)]
        session: Option<String>,
    },
    /// Print the stored messages of a session.
    History { session: String },
    /// Rate a message.
    Feedback {
        message: String,
        rating: Rating,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Rating {
    Like,
    Dislike,
}

impl From<Rating> for FeedbackRating {
    fn from(rating: Rating) -> Self {
        match rating {
            Rating::Like => FeedbackRating::Like,
            Rating::Dislike => FeedbackRating::Dislike,
        }
    }
}

/// Store plus the session collaborator it was built with.
pub(crate) struct Client {
    pub store: ChatStore,
    pub sessions: Arc<HttpSessions>,
}

impl Client {
    fn connect(config: &RippleConfig) -> Result<Self, RippleError> {
        let transport = HttpTransport::new(&config.client)?;
        let sessions = Arc::new(HttpSessions::new(
            transport.clone(),
            config.client.agent_id.clone(),
        ));
        let store = ChatStore::new(Arc::new(transport), sessions.clone(), config);
        Ok(Self { store, sessions })
    }

    fn select_session(&self, session: Option<String>) {
        if session.is_some() {
            self.sessions.set_current_session(session);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ripple_config::load_and_validate_path(path),
        None => ripple_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ripple_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.client.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: RippleConfig) -> Result<(), RippleError> {
    match command {
        Some(Commands::Send { text, dir, session }) => {
            let client = Client::connect(&config)?;
            client.select_session(session);
            send::run_send(&client.store, &text, dir.as_deref()).await
        }
        Some(Commands::Shell { session }) => {
            let client = Client::connect(&config)?;
            client.select_session(session);
            shell::run_shell(&client).await
        }
        Some(Commands::History { session }) => {
            let client = Client::connect(&config)?;
            history::run_history(&client.store, &session).await
        }
        Some(Commands::Feedback {
            message,
            rating,
            comment,
        }) => {
            let client = Client::connect(&config)?;
            history::run_feedback(&client.store, &message, rating.into(), &comment).await
        }
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| RippleError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            Ok(())
        }
        None => {
            println!("ripple: use --help for available commands");
            Ok(())
        }
    }
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ripple={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_with_flags() {
        let cli = Cli::try_parse_from([
            "ripple", "send", "hello", "--dir", "/tmp/work", "--session", "s1",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Send { text, dir, session }) => {
                assert_eq!(text, "hello");
                assert_eq!(dir.as_deref(), Some("/tmp/work"));
                assert_eq!(session.as_deref(), Some("s1"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_feedback_rating() {
        let cli =
            Cli::try_parse_from(["ripple", "feedback", "m1", "dislike", "--comment", "off"])
                .unwrap();
        let Some(Commands::Feedback { rating, comment, .. }) = cli.command else {
            panic!("expected feedback");
        };
        assert_eq!(FeedbackRating::from(rating), FeedbackRating::Dislike);
        assert_eq!(comment, "off");
    }

    #[test]
    fn rejects_unknown_rating() {
        assert!(Cli::try_parse_from(["ripple", "feedback", "m1", "meh"]).is_err());
    }

    #[test]
    fn default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&RippleConfig::default()).unwrap();
        assert!(rendered.contains("[reconnect]"));
        assert!(rendered.contains("variant = \"auto\""));
    }
}
