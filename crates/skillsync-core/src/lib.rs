//! Core types for the SkillSync realtime messaging channel.
//!
//! This crate provides the data model and the frame envelope. Connection
//! management lives in `skillsync-client`; this crate only knows what goes
//! over the wire.

mod event;
mod message;
mod participant;

pub use event::{ClientEvent, FrameError, ServerEvent};
pub use message::{Message, OutgoingMessage};
pub use participant::Participant;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No live transport.
    #[default]
    Disconnected,
    /// Handshake in flight.
    Connecting,
    /// Handshake accepted, frames flowing.
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}
