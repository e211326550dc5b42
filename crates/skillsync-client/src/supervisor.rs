//! Connection supervisor.
//!
//! Owns at most one live [`Link`] and publishes the connection state. There
//! is no retry or backoff: a failed or closed connection stays down until the
//! caller binds again.

use crate::error::ChannelError;
use crate::session::Credential;
use crate::transport::{Connector, Link, LinkEvent};
use skillsync_core::{ClientEvent, ConnectionState, Message, ServerEvent};
use tokio::sync::watch;
use url::Url;

/// Inbound traffic after lifecycle frames have been folded into state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(Message),
    Disconnected { reason: String },
}

pub struct Supervisor<C> {
    connector: C,
    endpoint: Url,
    link: Option<Link>,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(connector: C, endpoint: Url) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            endpoint,
            link: None,
            state,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// User id confirmed by the server for the live link.
    pub fn user_id(&self) -> Option<&str> {
        self.link.as_ref().map(Link::user_id)
    }

    /// Open a transport for `credential`, replacing any live one.
    ///
    /// Without a credential nothing is opened and the state stays
    /// `Disconnected`.
    pub async fn bind(&mut self, credential: Option<&Credential>) -> Result<(), ChannelError> {
        let Some(credential) = credential else {
            tracing::debug!("no credential, not connecting");
            return Err(ChannelError::MissingCredential);
        };

        self.unbind();

        let mut pending = PendingHandshake::start(&self.state);
        match self.connector.connect(&self.endpoint, credential).await {
            Ok(link) => {
                tracing::info!(endpoint = %self.endpoint, user_id = link.user_id(), "connected");
                self.link = Some(link);
                pending.settle(ConnectionState::Connected);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(endpoint = %self.endpoint, %error, "connect_error");
                Err(error.into())
            }
        }
    }

    /// Tear down the live transport, if any.
    pub fn unbind(&mut self) {
        if let Some(link) = self.link.take() {
            tracing::info!(user_id = link.user_id(), "disconnecting");
        }
        publish(&self.state, ConnectionState::Disconnected);
    }

    /// Queue an outbound frame without waiting.
    pub fn emit(&self, event: ClientEvent) -> Result<(), ChannelError> {
        match &self.link {
            Some(link) => link.emit(event),
            None => Err(ChannelError::NotConnected),
        }
    }

    /// Wait for the next inbound message or disconnect. Pends forever while
    /// unbound.
    pub async fn next_inbound(&mut self) -> Inbound {
        loop {
            let Some(link) = self.link.as_mut() else {
                return std::future::pending().await;
            };
            let event = link.recv().await;
            if let Some(inbound) = self.absorb(event) {
                return inbound;
            }
        }
    }

    /// Next queued inbound message or disconnect, without waiting.
    pub fn try_inbound(&mut self) -> Option<Inbound> {
        loop {
            let event = self.link.as_mut()?.try_recv()?;
            if let Some(inbound) = self.absorb(event) {
                return Some(inbound);
            }
        }
    }

    fn absorb(&mut self, event: LinkEvent) -> Option<Inbound> {
        match event {
            LinkEvent::Frame(ServerEvent::ReceiveMessage(message)) => Some(Inbound::Message(message)),
            LinkEvent::Frame(ServerEvent::Disconnect { reason }) | LinkEvent::Closed { reason } => {
                if let Some(link) = self.link.take() {
                    tracing::info!(user_id = link.user_id(), %reason, "disconnected");
                }
                publish(&self.state, ConnectionState::Disconnected);
                Some(Inbound::Disconnected { reason })
            }
            LinkEvent::Frame(other) => {
                tracing::debug!(event = ?other, "ignoring handshake frame on live link");
                None
            }
        }
    }
}

impl<C> Drop for Supervisor<C> {
    fn drop(&mut self) {
        if self.link.take().is_some() {
            publish(&self.state, ConnectionState::Disconnected);
        }
    }
}

/// Holds the state at `Connecting` and falls back to `Disconnected` on every
/// exit that does not settle it, including cancellation.
struct PendingHandshake<'a> {
    state: &'a watch::Sender<ConnectionState>,
    settled: bool,
}

impl<'a> PendingHandshake<'a> {
    fn start(state: &'a watch::Sender<ConnectionState>) -> Self {
        publish(state, ConnectionState::Connecting);
        Self {
            state,
            settled: false,
        }
    }

    fn settle(&mut self, next: ConnectionState) {
        publish(self.state, next);
        self.settled = true;
    }
}

impl Drop for PendingHandshake<'_> {
    fn drop(&mut self) {
        if !self.settled {
            publish(self.state, ConnectionState::Disconnected);
        }
    }
}

/// Publish only real transitions, so subscribers never see a repeated state.
fn publish(state: &watch::Sender<ConnectionState>, next: ConnectionState) {
    state.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
