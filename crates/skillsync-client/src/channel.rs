//! The messaging channel.
//!
//! A [`Channel`] is what a UI chat surface mounts. It follows the session
//! watch and rebinds the transport whenever the bearer token changes; the UI
//! never binds or unbinds by hand. Inbound frames are applied by whoever
//! drives [`Channel::next_event`] or [`Channel::drain`], so all mutation of
//! the history happens on the owning task.

use crate::buffer::MessageBuffer;
use crate::config::ChannelConfig;
use crate::error::ConfigError;
use crate::gateway::{Clock, SendGateway, SystemClock};
use crate::session::{Credential, Session, SessionUser};
use crate::supervisor::{Inbound, Supervisor};
use crate::transport::Connector;
use skillsync_core::{ConnectionState, Message};
use tokio::sync::watch;

/// What changed after a call to [`Channel::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// First transport for this session is up.
    Connected,
    /// The token changed and the transport was replaced.
    Rebound,
    /// A message arrived and was appended.
    Received(Message),
    /// The transport went down or could not be opened.
    Disconnected { reason: String },
    /// The session lost its token; no transport is open.
    SessionEnded,
}

pub struct Channel<C, K = SystemClock> {
    supervisor: Supervisor<C>,
    buffer: MessageBuffer,
    gateway: SendGateway<K>,
    sessions: watch::Receiver<Option<Session>>,
    sessions_open: bool,
    user: Option<SessionUser>,
    credential: Option<Credential>,
    /// User whose conversation is in the buffer.
    history_owner: Option<String>,
    /// Set while a bind is awaited; still set on the next call means the
    /// previous call was cancelled mid-handshake.
    rebinding: bool,
    /// The awaited bind replaces an earlier transport.
    replacing: bool,
}

impl<C: Connector> Channel<C> {
    pub async fn mount(
        config: &ChannelConfig,
        connector: C,
        sessions: watch::Receiver<Option<Session>>,
    ) -> Result<Self, ConfigError> {
        Self::mount_with_clock(config, connector, sessions, SystemClock).await
    }
}

impl<C: Connector, K: Clock> Channel<C, K> {
    /// Mount with an explicit clock for optimistic ids.
    pub async fn mount_with_clock(
        config: &ChannelConfig,
        connector: C,
        sessions: watch::Receiver<Option<Session>>,
        clock: K,
    ) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;
        let mut channel = Self {
            supervisor: Supervisor::new(connector, endpoint),
            buffer: MessageBuffer::new(),
            gateway: SendGateway::new(clock),
            sessions,
            sessions_open: true,
            user: None,
            credential: None,
            history_owner: None,
            rebinding: false,
            replacing: false,
        };
        let session = channel.sessions.borrow_and_update().clone();
        if let Some(event) = channel.apply_session(session).await {
            tracing::debug!(?event, "mounted");
        }
        Ok(channel)
    }

    /// Wait for the next session change or inbound frame and apply it.
    ///
    /// Returns `None` once the session source is gone and no transport is
    /// live. Cancel safe: a rebind interrupted by dropping the future is
    /// retried on the next call.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        if std::mem::take(&mut self.rebinding) {
            tracing::debug!("resuming interrupted bind");
            self.credential = None;
            let session = self.sessions.borrow_and_update().clone();
            match self.apply_session(session).await {
                Some(event) => return Some(event),
                // The token went away while the bind was cut off.
                None if std::mem::take(&mut self.replacing) => {
                    tracing::info!("session ended");
                    return Some(ChannelEvent::SessionEnded);
                }
                None => {}
            }
        }
        loop {
            if !self.sessions_open && !self.supervisor.is_connected() {
                return None;
            }
            tokio::select! {
                changed = self.sessions.changed(), if self.sessions_open => {
                    if changed.is_err() {
                        tracing::debug!("session source closed");
                        self.sessions_open = false;
                        continue;
                    }
                    let session = self.sessions.borrow_and_update().clone();
                    if let Some(event) = self.apply_session(session).await {
                        return Some(event);
                    }
                }
                inbound = self.supervisor.next_inbound() => {
                    return Some(self.apply_inbound(inbound));
                }
            }
        }
    }

    /// Apply every inbound frame already queued, without waiting.
    pub fn drain(&mut self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        while let Some(inbound) = self.supervisor.try_inbound() {
            events.push(self.apply_inbound(inbound));
        }
        events
    }

    /// Send `body` to `receiver_id`. Fire-and-forget: returns the optimistic
    /// id, or `None` if the send was dropped (and logged).
    pub fn send(&mut self, receiver_id: &str, body: &str) -> Option<String> {
        let sender = self.user.as_ref().and_then(SessionUser::participant);
        self.gateway.send(
            &self.supervisor,
            &mut self.buffer,
            sender.as_ref(),
            receiver_id,
            body,
        )
    }

    pub fn messages(&self) -> &[Message] {
        self.buffer.messages()
    }

    pub fn subscribe_messages(&self) -> watch::Receiver<u64> {
        self.buffer.subscribe()
    }

    pub fn reset_messages(&mut self) {
        self.buffer.reset();
    }

    pub fn is_connected(&self) -> bool {
        self.supervisor.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.subscribe()
    }

    pub fn current_user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    async fn apply_session(&mut self, session: Option<Session>) -> Option<ChannelEvent> {
        let credential = session.as_ref().and_then(Session::credential);
        self.user = session.map(|s| s.user);

        if credential == self.credential {
            return None;
        }

        let previous = self.credential.take();
        let replacing = previous.is_some() || std::mem::take(&mut self.replacing);
        self.supervisor.unbind();
        self.credential = credential;

        let Some(credential) = &self.credential else {
            return replacing.then(|| {
                tracing::info!("session ended");
                ChannelEvent::SessionEnded
            });
        };

        let user_id = self.user.as_ref().map(|u| u.id.clone());
        if self.history_owner.is_some() && self.history_owner != user_id {
            tracing::debug!(user_id = ?user_id, "user changed, clearing history");
            self.buffer.reset();
        }
        self.history_owner = user_id;

        self.rebinding = true;
        self.replacing = replacing;
        let result = self.supervisor.bind(Some(credential)).await;
        self.rebinding = false;
        self.replacing = false;
        match result {
            Ok(()) if replacing => Some(ChannelEvent::Rebound),
            Ok(()) => Some(ChannelEvent::Connected),
            Err(error) => {
                tracing::warn!(%error, "could not open messaging channel");
                Some(ChannelEvent::Disconnected {
                    reason: error.to_string(),
                })
            }
        }
    }

    fn apply_inbound(&mut self, inbound: Inbound) -> ChannelEvent {
        match inbound {
            Inbound::Message(message) => {
                tracing::debug!(message_id = %message.id, sender = %message.sender.id, "message received");
                self.buffer.append(message.clone());
                ChannelEvent::Received(message)
            }
            Inbound::Disconnected { reason } => ChannelEvent::Disconnected { reason },
        }
    }
}
