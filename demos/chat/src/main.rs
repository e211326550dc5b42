//! Terminal chat client on top of `skillsync-client`.
//!
//! Every line typed is sent to `--to`. `/token NEW` swaps the session token
//! (the channel rebinds on its own), `/logout` drops it, `/history` prints
//! the buffer.
//!
//! Against the development relay:
//!   cargo run -p skillsync-relay -- --user tok-A=u1:Alice --user tok-B=u2:Bob
//!   cargo run -p skillsync-chat -- --api-url http://127.0.0.1:5000/api \
//!       --user-id u2 --name Bob --token tok-B --to u1

use clap::Parser;
use skillsync_client::{Channel, ChannelConfig, ChannelEvent, Session, WsConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "skillsync-chat", about = "Terminal client for SkillSync chat")]
struct Args {
    /// REST API base; the socket endpoint is derived from it.
    #[arg(long, env = "SKILLSYNC_API_URL")]
    api_url: String,
    /// Bearer token of the session.
    #[arg(long, env = "SKILLSYNC_TOKEN")]
    token: Option<String>,
    /// Id of the signed-in user.
    #[arg(long, env = "SKILLSYNC_USER_ID")]
    user_id: String,
    /// Display name of the signed-in user.
    #[arg(long)]
    name: Option<String>,
    /// Receiver of typed messages.
    #[arg(long)]
    to: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("skillsync_client=info".parse()?)
                .add_directive("skillsync_chat=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = ChannelConfig::new(&args.api_url);
    let session = |token: Option<String>| {
        Some(Session::new(args.user_id.clone(), args.name.clone(), token))
    };

    let (session_tx, session_rx) = watch::channel(session(args.token.clone()));
    let mut channel = Channel::mount(&config, WsConnector::new(&config), session_rx).await?;
    let endpoint = config.endpoint()?;
    tracing::info!(
        %endpoint,
        state = ?channel.connection_state(),
        "channel mounted"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if let Some(token) = line.strip_prefix("/token ") {
                    tracing::debug!("swapping session token");
                    session_tx.send_replace(session(Some(token.trim().to_string())));
                } else if line == "/logout" {
                    tracing::debug!("dropping session token");
                    session_tx.send_replace(session(None));
                } else if line == "/history" {
                    for m in channel.messages() {
                        println!("[{}] {} -> {}: {}", m.created_at, m.sender, m.receiver, m.message);
                    }
                } else if !line.is_empty() && channel.send(&args.to, line).is_none() {
                    println!("(not sent: offline)");
                }
            }
            event = channel.next_event() => {
                match event {
                    Some(ChannelEvent::Received(m)) => println!("{}: {}", m.sender, m.message),
                    Some(ChannelEvent::Connected) => println!("(connected)"),
                    Some(ChannelEvent::Rebound) => println!("(reconnected with new token)"),
                    Some(ChannelEvent::SessionEnded) => println!("(signed out)"),
                    Some(ChannelEvent::Disconnected { reason }) => {
                        tracing::warn!(%reason, "channel disconnected");
                        println!("(disconnected: {reason})");
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}
