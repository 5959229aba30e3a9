//! Unified error types for meshsync core.

use meshsync_client::ClientError;
use meshsync_types::error::{ConfigError, SyncError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for construction and wiring paths.
///
/// Runtime sync failures never surface here; they are logged and counted by
/// the component that hit them.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Configuration is invalid; the engine refuses to start.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Synchronization failure surfaced to a caller (one-off fetches).
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Peer HTTP client could not be built or a request failed.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Tokio runtime or task failure.
    #[error("Task error: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl Serialize for CoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for meshsync core operations.
pub type CoreResult<T> = Result<T, CoreError>;
