//! Development relay for the SkillSync messaging channel.
//!
//! Speaks the channel's wire protocol so the client can be exercised without
//! the production backend. Tokens are fixed on the command line; messages are
//! stamped, delivered to the receiver, and echoed to the sender. Nothing is
//! persisted.
//!
//! Run:
//!   cargo run -p skillsync-relay -- --user tok-A=u1:Alice --user tok-B=u2:Bob

mod server;
mod users;

use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;
use users::{Directory, UserSpec};

#[derive(Debug, Parser)]
#[command(name = "skillsync-relay", about = "Development relay for SkillSync chat")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "SKILLSYNC_RELAY_PORT", default_value_t = 5000)]
    port: u16,
    /// Accepted user, as TOKEN=ID[:NAME]. Repeatable.
    #[arg(long = "user", required = true)]
    users: Vec<UserSpec>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("skillsync_relay=info".parse()?))
        .init();

    let args = Args::parse();
    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    let directory = Directory::new(args.users);

    tracing::info!("Starting relay on {} with {} users", addr, directory.len());

    server::run(addr, directory).await
}
