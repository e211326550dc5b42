//! Session and credential model.
//!
//! The session is owned by the authentication layer; the channel only reads
//! it. A [`Credential`] is the session's bearer token, and only exists when
//! that token is non-empty.

use serde::{Deserialize, Serialize};
use skillsync_core::Participant;
use std::fmt;

/// Display name used for the local user when the session carries none.
pub const FALLBACK_SENDER_NAME: &str = "You";

/// The authenticated session as exposed by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        name: Option<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            user: SessionUser {
                id: id.into(),
                name,
                access_token,
            },
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.user.access_token.as_deref().and_then(Credential::new)
    }
}

impl SessionUser {
    /// The local user as a message sender, if the session identifies one.
    pub fn participant(&self) -> Option<Participant> {
        if self.id.trim().is_empty() {
            return None;
        }
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(FALLBACK_SENDER_NAME);
        Some(Participant::new(self.id.clone(), name))
    }
}

impl fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionUser")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A non-empty bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for empty or whitespace-only tokens.
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
