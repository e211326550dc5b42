//! Error types for the messaging channel.

use skillsync_core::FrameError;
use std::path::PathBuf;
use std::time::Duration;

/// Error building a [`ChannelConfig`](crate::ChannelConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid API url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Error opening or running a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection rejected: {0}")]
    Rejected(String),
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
    #[error("connection closed during handshake")]
    ClosedDuringHandshake,
    #[error("unexpected {0} frame during handshake")]
    UnexpectedFrame(&'static str),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Error from a channel operation.
///
/// These never reach UI code: the [`Channel`](crate::Channel) logs them and
/// reflects the outcome in its connection state and message sequence.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("no credential in session")]
    MissingCredential,
    #[error("not connected")]
    NotConnected,
    #[error("outbound queue is full")]
    QueueFull,
    #[error("outbound queue is closed")]
    QueueClosed,
    #[error(transparent)]
    Transport(#[from] TransportError),
}
