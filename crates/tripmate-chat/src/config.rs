//! Chat client configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::decoder::ReplyField;

/// Configuration for the chat backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Backend base URL (e.g., "http://localhost:8000").
    #[serde(default = "ChatConfig::default_base_url")]
    pub base_url: String,

    /// Path of the chat endpoint; the session ID is appended when present.
    #[serde(default = "ChatConfig::default_chat_path")]
    pub chat_path: String,

    /// Whether the chat endpoint streams NDJSON records or answers with a
    /// single JSON object.
    #[serde(default = "ChatConfig::default_streaming")]
    pub streaming: bool,

    /// Name of the field carrying assistant text. Defaults to `response`
    /// when streaming and `reply` otherwise.
    #[serde(default)]
    pub reply_field: Option<String>,

    /// Connection timeout in seconds.
    #[serde(default = "ChatConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Timeout in seconds for requests whose body is read in one piece
    /// (session API and single-shot chat). Streaming responses are not
    /// bounded; dropping the send cancels them.
    #[serde(default = "ChatConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ChatConfig {
    fn default_base_url() -> String {
        "http://localhost:8000".to_string()
    }

    fn default_chat_path() -> String {
        "/chat".to_string()
    }

    const fn default_streaming() -> bool {
        true
    }

    const fn default_connect_timeout() -> u64 {
        10
    }

    const fn default_request_timeout() -> u64 {
        120
    }

    /// Configuration for a backend at `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Switch to the single-shot endpoint format.
    #[must_use]
    pub fn single_shot(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// The reply field in effect.
    #[must_use]
    pub fn reply_field(&self) -> ReplyField {
        match (&self.reply_field, self.streaming) {
            (Some(name), _) => ReplyField::new(name.clone()),
            (None, true) => ReplyField::response(),
            (None, false) => ReplyField::reply(),
        }
    }

    /// Get the connection timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            chat_path: Self::default_chat_path(),
            streaming: Self::default_streaming(),
            reply_field: None,
            connect_timeout_seconds: Self::default_connect_timeout(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}
