//! Conversation participants.
//!
//! A participant is an `{ id, name }` pair. The id is the backend's user id;
//! the name is display-only and may be empty when the client does not know it
//! (the server is the source of truth for receiver metadata).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Participant {
    /// Create a participant with a known display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Create a participant whose display name is not resolved client-side.
    pub fn unresolved(id: impl Into<String>) -> Self {
        Self::new(id, "")
    }

    /// Whether the display name is known.
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_name() {
            write!(f, "{} ({})", self.name, self.id)
        } else {
            f.write_str(&self.id)
        }
    }
}
