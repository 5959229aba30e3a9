use meshsync_types::models::SyncConfig;
use std::time::Duration;

/// Timeouts applied to every peer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub connection_timeout: Duration,
    pub read_timeout: Duration,
}

impl ClientConfig {
    /// Overall deadline of one request.
    pub fn request_timeout(&self) -> Duration {
        self.connection_timeout + self.read_timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for ClientConfig {
    fn from(sync: &SyncConfig) -> Self {
        Self { connection_timeout: sync.connection_timeout(), read_timeout: sync.read_timeout() }
    }
}
