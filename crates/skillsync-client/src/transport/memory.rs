//! In-process transport.
//!
//! [`MemoryConnector`] accepts a fixed table of tokens and hands the server
//! half of every link it opens to a [`MemoryServer`], so tests and embedders
//! can push frames and observe what the client emits.

use super::{Connector, Link, LinkEvent};
use crate::error::TransportError;
use crate::session::Credential;
use skillsync_core::{ClientEvent, ServerEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use url::Url;

const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    users: Arc<HashMap<String, String>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
    attempts: Arc<AtomicUsize>,
}

/// Receives the server half of each accepted link.
#[derive(Debug)]
pub struct MemoryServer {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Server half of one link.
#[derive(Debug)]
pub struct MemoryPeer {
    pub token: String,
    pub user_id: String,
    inbound: mpsc::Sender<LinkEvent>,
    outbound: mpsc::Receiver<ClientEvent>,
}

impl MemoryConnector {
    /// `users` maps accepted tokens to the user id the server confirms.
    pub fn new<I, T, U>(users: I) -> (Self, MemoryServer)
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        let users = users
            .into_iter()
            .map(|(token, user)| (token.into(), user.into()))
            .collect();
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let connector = Self {
            users: Arc::new(users),
            peers: peers_tx,
            attempts: Arc::new(AtomicUsize::new(0)),
        };
        (connector, MemoryServer { peers: peers_rx })
    }

    /// Number of connect attempts, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    async fn connect(&self, _endpoint: &Url, credential: &Credential) -> Result<Link, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let token = credential.expose();
        let user_id = self
            .users
            .get(token)
            .cloned()
            .ok_or_else(|| TransportError::Rejected("invalid token".to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let peer = MemoryPeer {
            token: token.to_string(),
            user_id: user_id.clone(),
            inbound: inbound_tx,
            outbound: outbound_rx,
        };
        if self.peers.send(peer).is_err() {
            return Err(TransportError::ClosedDuringHandshake);
        }
        Ok(Link::new(user_id, outbound_tx, inbound_rx))
    }
}

impl MemoryServer {
    pub async fn next_peer(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    pub fn try_next_peer(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

impl MemoryPeer {
    /// Deliver a frame to the client. Returns `false` if the link is gone.
    pub async fn push(&self, event: ServerEvent) -> bool {
        self.inbound.send(LinkEvent::Frame(event)).await.is_ok()
    }

    /// Close the link from the server side.
    pub async fn close(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.inbound.send(LinkEvent::Closed { reason }).await.is_ok()
    }

    /// Next frame the client emitted, if any is queued.
    pub fn try_next_frame(&mut self) -> Option<ClientEvent> {
        self.outbound.try_recv().ok()
    }

    pub async fn next_frame(&mut self) -> Option<ClientEvent> {
        self.outbound.recv().await
    }

    /// Whether the client has dropped its end of the link.
    pub fn is_closed(&self) -> bool {
        self.inbound.is_closed()
    }
}
