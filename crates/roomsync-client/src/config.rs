//! Client configuration.

use std::time::Duration;

/// Backend address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Fixed delay between a push-channel failure and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme, host and port of the backend, without a trailing path.
    pub base_url: String,
    /// Delay before reconnecting the push channel.
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_owned(), reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }
}

impl ClientConfig {
    /// Configuration for `base_url` with default timing.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Absolute URL for a request path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
