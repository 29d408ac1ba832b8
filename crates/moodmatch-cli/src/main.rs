//! # moodmatch
//!
//! Terminal chat client: wires settings, credentials, and the realtime
//! client together and bridges them to stdin/stdout.

#![deny(unsafe_code)]

mod chat;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use moodmatch_auth::{FileTokenProvider, MemoryTokenProvider, TokenProvider, auth_file_path};
use moodmatch_core::ConnectionState;
use moodmatch_core::logging::{init_json_subscriber, init_subscriber};
use moodmatch_realtime::{ClientConfig, ConnectContext, MoodMatchClient};
use moodmatch_settings::{MoodMatchSettings, load_settings_from_path, settings_dir, settings_path};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::chat::{ChatSession, Input, parse_input};
use crate::render::Printer;

/// MoodMatch terminal chat client.
#[derive(Parser, Debug)]
#[command(name = "moodmatch", about = "MoodMatch realtime chat client")]
struct Cli {
    /// WebSocket endpoint (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// Bearer token. Without it, the token in the auth file is used.
    #[arg(long)]
    token: Option<String>,

    /// Persist `--token` (and `--user-id`) to the auth file.
    #[arg(long, requires = "token")]
    save_token: bool,

    /// Mood to queue for whenever a connection opens.
    #[arg(long)]
    mood: Option<String>,

    /// User ID, for log context.
    #[arg(long)]
    user_id: Option<String>,

    /// Display name, for log context.
    #[arg(long, default_value = "anonymous")]
    nickname: String,

    /// Log filter (overrides settings), e.g. `debug` or `moodmatch_realtime=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Print events as JSON lines.
    #[arg(long)]
    json: bool,

    /// Settings file (default: `~/.moodmatch/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn auth_path(settings: &MoodMatchSettings) -> PathBuf {
    settings
        .auth
        .auth_file
        .as_ref()
        .map_or_else(|| auth_file_path(&settings_dir()), PathBuf::from)
}

/// Pick the credential source: an explicit token, or the auth file.
fn token_provider(
    args: &Cli,
    settings: &MoodMatchSettings,
) -> Result<(Arc<dyn TokenProvider>, Option<String>)> {
    let path = auth_path(settings);
    match &args.token {
        Some(token) if args.save_token => {
            let provider = FileTokenProvider::open(&path);
            provider
                .update_token(args.user_id.clone(), Some(token.clone()))
                .with_context(|| format!("Failed to save token to {}", path.display()))?;
            tracing::info!(path = %path.display(), "token saved");
            let user_id = provider.user_id();
            Ok((Arc::new(provider), user_id))
        }
        Some(token) => Ok((
            Arc::new(MemoryTokenProvider::new(Some(token.clone()))),
            None,
        )),
        None => {
            let provider = FileTokenProvider::open(&path);
            let user_id = provider.user_id();
            Ok((Arc::new(provider), user_id))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Settings first: they pick the log level.
    let path = args.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(url) = &args.url {
        settings.realtime.ws_url.clone_from(url);
    }

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.as_filter_str().to_owned());
    if settings.logging.json {
        init_json_subscriber(&level);
    } else {
        init_subscriber(&level);
    }

    // wss:// needs a process-wide crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let (tokens, stored_user) = token_provider(&args, &settings)?;
    let context = ConnectContext {
        user_id: args.user_id.clone().or(stored_user).unwrap_or_default(),
        nickname: args.nickname.clone(),
        mood: args.mood.clone().unwrap_or_default(),
        avatar: None,
    };

    let client = MoodMatchClient::new(ClientConfig::from(&settings.realtime), tokens);
    let printer = Printer::new(args.json);
    let mut chat = ChatSession::new(args.mood.clone());

    let mut events = client.subscribe();
    let mut states = client.connection_state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tracing::info!(url = %settings.realtime.ws_url, "starting");
    client.connect(context).await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    chat.observe(&event);
                    printer.event(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "terminal fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                printer.state(state);
                if state == ConnectionState::Connected {
                    if let Some(command) = chat.on_connected() {
                        let _ = client.send(&command);
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Retry => client.retry().await,
                    Input::Empty => {}
                    input => match chat.command_for(input) {
                        Ok(command) => {
                            if !client.send(&command) {
                                printer.note("not connected; command dropped");
                            }
                        }
                        Err(message) => printer.note(&message),
                    },
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    client.disconnect().await;
    Ok(())
}
