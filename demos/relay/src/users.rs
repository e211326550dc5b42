//! Development token table.

use skillsync_core::Participant;
use std::collections::HashMap;
use std::str::FromStr;

/// One `TOKEN=ID:NAME` entry from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub token: String,
    pub user: Participant,
}

impl FromStr for UserSpec {
    type Err = UserSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (token, rest) = s
            .split_once('=')
            .ok_or_else(|| UserSpecError::MissingEquals(s.to_string()))?;
        let (id, name) = rest.split_once(':').unwrap_or((rest, ""));
        if token.is_empty() {
            return Err(UserSpecError::EmptyToken);
        }
        if id.is_empty() {
            return Err(UserSpecError::EmptyId);
        }
        Ok(Self {
            token: token.to_string(),
            user: Participant::new(id, name),
        })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UserSpecError {
    #[error("user must look like TOKEN=ID[:NAME], got: {0}")]
    MissingEquals(String),
    #[error("token cannot be empty")]
    EmptyToken,
    #[error("user id cannot be empty")]
    EmptyId,
}

/// Accepted tokens and the directory of known users.
#[derive(Debug, Default)]
pub struct Directory {
    by_token: HashMap<String, Participant>,
}

impl Directory {
    pub fn new(specs: impl IntoIterator<Item = UserSpec>) -> Self {
        Self {
            by_token: specs.into_iter().map(|s| (s.token, s.user)).collect(),
        }
    }

    pub fn authenticate(&self, token: &str) -> Option<&Participant> {
        self.by_token.get(token)
    }

    /// Resolve a user id to a participant; unknown ids get an empty name.
    pub fn resolve(&self, id: &str) -> Participant {
        self.by_token
            .values()
            .find(|p| p.id == id)
            .cloned()
            .unwrap_or_else(|| Participant::unresolved(id))
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }
}
