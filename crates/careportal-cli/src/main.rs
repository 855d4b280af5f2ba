//! careportal-chat: terminal client for CarePortal realtime chat.
//!
//! Logs in to the portal's STOMP broker, opens the requested conversation
//! and emergency channel, prints inbound events, and sends each line read
//! from stdin as a chat message.

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use careportal_common::PortalError;
use careportal_config::PortalConfig;
use careportal_realtime::{ClientConfig, PortalSession, PortalUser, RealtimeClient};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

const TOKEN_ENV: &str = "CAREPORTAL_TOKEN";

#[derive(Parser)]
#[command(name = "careportal-chat", about = "Terminal client for CarePortal realtime chat")]
struct Args {
    /// Config file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Broker endpoint, overriding `realtime.endpoint` from the config.
    #[arg(long)]
    endpoint: Option<String>,

    /// Bearer token presented on CONNECT.
    #[arg(long, env = "CAREPORTAL_TOKEN", hide_env_values = true)]
    token: String,

    /// Portal user id of the logged-in account.
    #[arg(long)]
    user_id: i64,

    /// Account role (patient, doctor, admin).
    #[arg(long, default_value = "patient")]
    role: String,

    /// Display name attached to outgoing messages.
    #[arg(long)]
    name: Option<String>,

    /// Conversation to open; stdin lines are sent here.
    #[arg(long)]
    conversation: Option<i64>,

    /// Blood-group emergency channel to join.
    #[arg(long)]
    emergency_channel: Option<i64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("careportal-chat: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter_directive().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "careportal-chat exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<PortalConfig, PortalError> {
    let mut config = match &args.config {
        Some(path) => {
            let config = careportal_config::load_from_path(path)?;
            careportal_config::validation::validate(&config)?;
            config
        }
        None => careportal_config::load_config()?,
    };
    if let Some(endpoint) = &args.endpoint {
        config.realtime.endpoint = endpoint.clone();
        careportal_config::validation::validate(&config)?;
    }
    Ok(config)
}

async fn run(args: Args, config: PortalConfig) -> Result<(), PortalError> {
    let client = RealtimeClient::new(ClientConfig::from(&config.realtime));

    // Re-read the environment on every retry so a refreshed token is used.
    let fallback = args.token.clone();
    client.set_credential_provider(move || {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .or_else(|| Some(fallback.clone()))
    });

    let (session, mut events) = PortalSession::new(client);

    let mut user = PortalUser::new(args.user_id).with_role(args.role.to_uppercase());
    if let Some(name) = &args.name {
        user = user.with_name(name.clone());
    }

    tracing::info!(endpoint = %config.realtime.endpoint, user_id = user.id, "Logging in");
    if let Err(e) = session.login(user, args.token.clone()).await {
        print_toasts(&session);
        return Err(PortalError::Realtime(e.to_string()));
    }

    if let Some(conversation_id) = args.conversation {
        session.open_conversation(conversation_id);
    }
    if let Some(channel_id) = args.emergency_channel {
        session.open_emergency_channel(channel_id);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break Ok(()) };
                println!("{}", render::event_line(chrono::Local::now(), &event));
                print_toasts(&session);
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => send_line(&session, args.conversation, &line),
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(PortalError::Io(e)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break Ok(());
            }
        }
    };

    session.logout();
    result
}

fn send_line(session: &PortalSession, conversation: Option<i64>, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    let Some(conversation_id) = conversation else {
        tracing::warn!("No conversation open; pass --conversation to send messages");
        return;
    };
    session.set_typing(conversation_id, true);
    if !session.send_chat_message(conversation_id, line) {
        eprintln!("(not sent: connection is down)");
    }
}

fn print_toasts(session: &PortalSession) {
    for toast in session.take_toasts() {
        println!("{}", render::toast_line(&toast));
    }
}
