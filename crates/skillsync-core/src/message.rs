//! Chat message records.

use crate::Participant;
use serde::{Deserialize, Serialize};

/// A chat message, either server-confirmed or optimistic.
///
/// Server-confirmed messages carry the backend's id. Optimistic messages carry
/// a client id derived from the send time in milliseconds; the two id spaces
/// are not guaranteed disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: String,
    pub sender: Participant,
    pub receiver: Participant,
    /// Body text.
    pub message: String,
    /// ISO-8601 timestamp as sent by the server. Never used for ordering.
    pub created_at: String,
}

/// Payload of an outbound `sendMessage` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub receiver_id: String,
    pub message: String,
}

impl OutgoingMessage {
    pub fn new(receiver_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            message: message.into(),
        }
    }
}
