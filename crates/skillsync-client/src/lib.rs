//! Realtime messaging channel for SkillSync.
//!
//! One authenticated WebSocket per active session, an ordered in-memory
//! message history, and a fire-and-forget send path with optimistic local
//! echo. Delivery guarantees (acks, retries, persistence) belong to the
//! server and are not implemented here.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use skillsync_client::{Channel, ChannelConfig, Session, WsConnector};
//! use tokio::sync::watch;
//!
//! let config = ChannelConfig::from_env()?;
//! let session = Session::new("u2", Some("Bob".into()), Some("tok-A".into()));
//! let (_session_tx, session_rx) = watch::channel(Some(session));
//!
//! let mut channel = Channel::mount(&config, WsConnector::new(&config), session_rx).await?;
//! channel.send("u1", "hello back");
//! while let Some(event) = channel.next_event().await {
//!     println!("{event:?}: {} messages", channel.messages().len());
//! }
//! # Ok(())
//! # }
//! ```

mod buffer;
mod channel;
mod config;
mod error;
mod gateway;
mod session;
mod supervisor;
pub mod transport;

pub use buffer::MessageBuffer;
pub use channel::{Channel, ChannelEvent};
pub use config::ChannelConfig;
pub use error::{ChannelError, ConfigError, TransportError};
pub use gateway::{Clock, SendGateway, SystemClock};
pub use session::{Credential, FALLBACK_SENDER_NAME, Session, SessionUser};
pub use supervisor::{Inbound, Supervisor};
pub use transport::{Connector, Link, LinkEvent, WsConnector};

pub use skillsync_core::{ConnectionState, Message, Participant};
