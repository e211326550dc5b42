//! Send gateway.
//!
//! Turns a compose action into a `sendMessage` frame plus an optimistic local
//! record. There is no acknowledgment correlation: the optimistic entry is
//! never matched against the server's echo, and its id is the send time in
//! milliseconds, so two sends within the same millisecond share an id.

use crate::buffer::MessageBuffer;
use crate::supervisor::Supervisor;
use crate::transport::Connector;
use chrono::{DateTime, SecondsFormat, Utc};
use skillsync_core::{ClientEvent, Message, OutgoingMessage, Participant};

/// Source of the current time for optimistic ids and timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendGateway<K = SystemClock> {
    clock: K,
}

impl<K: Clock> SendGateway<K> {
    pub fn new(clock: K) -> Self {
        Self { clock }
    }

    /// Emit `body` to `receiver_id` and append the optimistic record.
    ///
    /// Returns the optimistic id, or `None` when the send was dropped. Drops
    /// are logged and never surface as errors.
    pub fn send<C: Connector>(
        &self,
        supervisor: &Supervisor<C>,
        buffer: &mut MessageBuffer,
        sender: Option<&Participant>,
        receiver_id: &str,
        body: &str,
    ) -> Option<String> {
        if !supervisor.is_connected() {
            tracing::warn!(receiver_id, "not connected, dropping message");
            return None;
        }
        let Some(sender) = sender else {
            tracing::warn!(receiver_id, "sender unknown, dropping message");
            return None;
        };
        if receiver_id.trim().is_empty() || body.trim().is_empty() {
            tracing::warn!(receiver_id, "empty receiver or body, dropping message");
            return None;
        }

        let frame = ClientEvent::SendMessage(OutgoingMessage::new(receiver_id, body));
        if let Err(error) = supervisor.emit(frame) {
            tracing::warn!(receiver_id, %error, "failed to queue message");
            return None;
        }

        let message = self.optimistic(sender, receiver_id, body);
        let id = message.id.clone();
        tracing::debug!(message_id = %id, receiver_id, "message sent");
        buffer.append(message);
        Some(id)
    }

    fn optimistic(&self, sender: &Participant, receiver_id: &str, body: &str) -> Message {
        let now = self.clock.now();
        Message {
            id: now.timestamp_millis().to_string(),
            sender: sender.clone(),
            receiver: Participant::unresolved(receiver_id),
            message: body.to_string(),
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credential;
    use crate::transport::memory::{MemoryConnector, MemoryServer};
    use chrono::TimeZone;
    use url::Url;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixed() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())
    }

    async fn connected() -> (Supervisor<MemoryConnector>, MemoryServer) {
        let (connector, server) = MemoryConnector::new([("tok-A", "u2")]);
        let mut supervisor =
            Supervisor::new(connector, Url::parse("ws://localhost:5000/").unwrap());
        supervisor.bind(Credential::new("tok-A").as_ref()).await.unwrap();
        (supervisor, server)
    }

    #[tokio::test]
    async fn send_emits_frame_and_appends_optimistic_record() {
        let (supervisor, mut server) = connected().await;
        let mut peer = server.try_next_peer().unwrap();
        let mut buffer = MessageBuffer::new();
        let gateway = SendGateway::new(fixed());
        let me = Participant::new("u2", "Bob");

        let id = gateway
            .send(&supervisor, &mut buffer, Some(&me), "u1", "hello back")
            .unwrap();

        assert_eq!(
            peer.try_next_frame(),
            Some(ClientEvent::SendMessage(OutgoingMessage::new("u1", "hello back")))
        );
        assert_eq!(buffer.len(), 1);
        let entry = buffer.last().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.id, "1735732800000");
        assert_eq!(entry.sender, me);
        assert_eq!(entry.receiver, Participant::unresolved("u1"));
        assert_eq!(entry.message, "hello back");
        assert_eq!(entry.created_at, "2025-01-01T12:00:00.000Z");
    }

    #[tokio::test]
    async fn send_while_disconnected_is_dropped() {
        let (connector, _server) = MemoryConnector::new([("tok-A", "u2")]);
        let supervisor = Supervisor::new(connector, Url::parse("ws://localhost:5000/").unwrap());
        let mut buffer = MessageBuffer::new();
        let me = Participant::new("u2", "Bob");

        let sent = SendGateway::new(fixed()).send(&supervisor, &mut buffer, Some(&me), "u1", "hi");
        assert!(sent.is_none());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn send_without_sender_emits_nothing() {
        let (supervisor, mut server) = connected().await;
        let mut peer = server.try_next_peer().unwrap();
        let mut buffer = MessageBuffer::new();

        let sent = SendGateway::new(fixed()).send(&supervisor, &mut buffer, None, "u1", "hi");
        assert!(sent.is_none());
        assert!(buffer.is_empty());
        assert!(peer.try_next_frame().is_none());
    }

    #[tokio::test]
    async fn blank_body_is_dropped() {
        let (supervisor, mut server) = connected().await;
        let mut peer = server.try_next_peer().unwrap();
        let mut buffer = MessageBuffer::new();
        let me = Participant::new("u2", "Bob");
        let gateway = SendGateway::new(fixed());

        assert!(gateway.send(&supervisor, &mut buffer, Some(&me), "u1", "  ").is_none());
        assert!(gateway.send(&supervisor, &mut buffer, Some(&me), "", "hi").is_none());
        assert!(buffer.is_empty());
        assert!(peer.try_next_frame().is_none());
    }

    #[tokio::test]
    async fn same_millisecond_sends_share_an_id() {
        let (supervisor, _server) = connected().await;
        let mut buffer = MessageBuffer::new();
        let me = Participant::new("u2", "Bob");
        let gateway = SendGateway::new(fixed());

        let first = gateway.send(&supervisor, &mut buffer, Some(&me), "u1", "one");
        let second = gateway.send(&supervisor, &mut buffer, Some(&me), "u1", "two");
        assert_eq!(buffer.len(), 2);
        assert_eq!(first, second);
    }
}
