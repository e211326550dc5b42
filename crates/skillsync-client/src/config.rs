//! Channel configuration.
//!
//! The socket endpoint is derived from the REST API base: the `/api` suffix
//! is stripped and the scheme is mapped to its WebSocket counterpart, so
//! `https://api.skillsync.dev/api` becomes `wss://api.skillsync.dev/`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const ENV_API_URL: &str = "SKILLSYNC_API_URL";
pub const ENV_SOCKET_PATH: &str = "SKILLSYNC_SOCKET_PATH";
pub const ENV_HANDSHAKE_TIMEOUT: &str = "SKILLSYNC_HANDSHAKE_TIMEOUT_SECS";

const API_SUFFIX: &str = "/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// REST API base, e.g. `https://api.skillsync.dev/api`.
    pub api_url: String,
    /// Path appended to the derived origin. Empty means the origin root.
    #[serde(default)]
    pub socket_path: String,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Capacity of the inbound and outbound frame queues of a link.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_handshake_timeout_secs() -> u64 {
    10
}

fn default_queue_capacity() -> usize {
    64
}

impl ChannelConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            socket_path: String::new(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnv(ENV_API_URL))?;
        let mut config = Self::new(api_url);

        if let Some(path) = lookup(ENV_SOCKET_PATH) {
            config.socket_path = path;
        }
        if let Some(raw) = lookup(ENV_HANDSHAKE_TIMEOUT) {
            config.handshake_timeout_secs =
                raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_HANDSHAKE_TIMEOUT,
                    value: raw.clone(),
                })?;
        }
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// The WebSocket endpoint derived from `api_url` and `socket_path`.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        let base = trimmed.strip_suffix(API_SUFFIX).unwrap_or(trimmed);

        let mut url = Url::parse(base).map_err(|source| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::UnsupportedScheme(url.scheme().to_string()))?;

        let socket_path = self.socket_path.trim().trim_start_matches('/');
        if !socket_path.is_empty() {
            let path = format!("{}/{}", url.path().trim_end_matches('/'), socket_path);
            url.set_path(&path);
        }
        Ok(url)
    }
}
