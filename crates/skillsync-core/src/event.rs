//! Frame envelope.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}` carried
//! in one WebSocket text message.

use crate::{Message, OutgoingMessage};
use serde::{Deserialize, Serialize};

/// Frames sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Authenticate the connection. Must be the first frame.
    #[serde(rename = "auth")]
    Auth { token: String },
    /// Send a chat message to another user.
    #[serde(rename = "sendMessage")]
    SendMessage(OutgoingMessage),
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Handshake accepted.
    #[serde(rename = "connect")]
    Connect {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Handshake rejected. The server closes right after.
    #[serde(rename = "connect_error")]
    ConnectError { message: String },
    /// A message addressed to (or echoed back to) this user.
    #[serde(rename = "receiveMessage")]
    ReceiveMessage(Message),
    /// Server-initiated disconnect.
    #[serde(rename = "disconnect")]
    Disconnect { reason: String },
}

/// Error encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
#[error("malformed frame: {0}")]
pub struct FrameError(#[from] serde_json::Error);

impl ClientEvent {
    pub fn to_frame(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_frame(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerEvent {
    pub fn to_frame(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_frame(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }
}
