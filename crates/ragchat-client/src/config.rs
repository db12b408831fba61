use ragchat_core::{RagchatError, RagchatResult};
use ragchat_reveal::RevealRate;
use ragchat_stream::StreamOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted when the config carries no token.
pub const ACCESS_TOKEN_ENV: &str = "RAGCHAT_ACCESS_TOKEN";

/// Connection and pacing settings of the chat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the chat API, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Seconds without new bytes before a transfer is abandoned.
    #[serde(default = "default_stall_timeout_secs")]
    pub stall_timeout_secs: u64,
    /// Pace of the animated answer (`[reveal]` table).
    #[serde(default)]
    pub reveal: RevealRate,
}

fn default_stall_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            stall_timeout_secs: default_stall_timeout_secs(),
            reveal: RevealRate::default(),
        }
    }

    /// Read a TOML config file, filling a missing token from
    /// [`ACCESS_TOKEN_ENV`].
    pub async fn load(path: impl AsRef<Path>) -> RagchatResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            RagchatError::Config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        let mut config = Self::from_toml(&raw)?;
        if config.access_token.is_none() {
            config.access_token = std::env::var(ACCESS_TOKEN_ENV).ok();
        }
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(raw: &str) -> RagchatResult<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| RagchatError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> RagchatResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(RagchatError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.stall_timeout_secs == 0 {
            return Err(RagchatError::Config(
                "stall_timeout_secs must be greater than zero".into(),
            ));
        }
        if !(self.reveal.chars_per_second.is_finite() && self.reveal.chars_per_second > 0.0) {
            return Err(RagchatError::Config(
                "reveal.chars_per_second must be a positive number".into(),
            ));
        }
        Ok(())
    }

    /// Transport options derived from this config.
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            stall_timeout: Duration::from_secs(self.stall_timeout_secs),
        }
    }

    /// Reveal pace derived from this config.
    pub fn reveal_rate(&self) -> RevealRate {
        self.reveal
    }
}
