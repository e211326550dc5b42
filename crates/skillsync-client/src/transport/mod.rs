//! Transports.
//!
//! A [`Connector`] performs the authenticated handshake and hands back a
//! [`Link`]: the owned handle to one live transport. A link is a pair of
//! frame queues plus the I/O task feeding them. Dropping the link tears the
//! transport down.

pub mod memory;
mod ws;

pub use ws::WsConnector;

use crate::error::{ChannelError, TransportError};
use crate::session::Credential;
use skillsync_core::{ClientEvent, ServerEvent};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::task::JoinHandle;
use url::Url;

/// Something delivered by a live transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Frame(ServerEvent),
    Closed { reason: String },
}

/// Opens authenticated transports.
pub trait Connector {
    /// Connect to `endpoint`, present `credential`, and wait for the server to
    /// accept or reject the handshake.
    fn connect(
        &self,
        endpoint: &Url,
        credential: &Credential,
    ) -> impl Future<Output = Result<Link, TransportError>> + Send;
}

/// Owned handle to one live transport.
pub struct Link {
    user_id: String,
    outbound: mpsc::Sender<ClientEvent>,
    inbound: mpsc::Receiver<LinkEvent>,
    reader: Option<JoinHandle<()>>,
}

impl Link {
    pub fn new(
        user_id: impl Into<String>,
        outbound: mpsc::Sender<ClientEvent>,
        inbound: mpsc::Receiver<LinkEvent>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            outbound,
            inbound,
            reader: None,
        }
    }

    /// Attach the task that feeds `inbound`. It is aborted when the link drops.
    pub fn with_reader(mut self, reader: JoinHandle<()>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// The user id the server confirmed in the handshake.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Queue a frame without waiting.
    pub fn emit(&self, event: ClientEvent) -> Result<(), ChannelError> {
        self.outbound.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => ChannelError::QueueFull,
            TrySendError::Closed(_) => ChannelError::QueueClosed,
        })
    }

    pub async fn recv(&mut self) -> LinkEvent {
        self.inbound.recv().await.unwrap_or_else(closed)
    }

    pub fn try_recv(&mut self) -> Option<LinkEvent> {
        match self.inbound.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(closed()),
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

fn closed() -> LinkEvent {
    LinkEvent::Closed {
        reason: "transport closed".to_string(),
    }
}
