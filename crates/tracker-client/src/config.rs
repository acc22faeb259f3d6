//! Client configuration.

use std::time::Duration;

use tracker_core::defaults;

/// Default server base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Where and how the realtime subscriber connects.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, without a trailing slash.
    pub base_url: String,
    /// Path of the subscription endpoint.
    pub realtime_path: String,
    /// Fixed delay between reconnect attempts.
    pub retry_delay: Duration,
    /// Largest frame the decoder buffers before discarding it.
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            realtime_path: defaults::REALTIME_PATH.to_string(),
            retry_delay: Duration::from_millis(defaults::CLIENT_RETRY_MS),
            max_frame_bytes: defaults::CLIENT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn max_frame_bytes(mut self, bytes: usize) -> Self {
        self.max_frame_bytes = bytes;
        self
    }

    pub fn realtime_path(mut self, path: impl Into<String>) -> Self {
        self.realtime_path = path.into();
        self
    }

    /// Full subscription URL.
    pub fn subscription_url(&self) -> String {
        format!("{}{}", self.base_url, self.realtime_path)
    }
}
