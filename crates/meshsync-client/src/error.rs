//! Error types for the peer state client.

use thiserror::Error;

/// Errors that can occur when talking to a peer control plane.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to establish connection to the peer.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Peer URI could not be turned into a request URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Peer returned a body that is not a valid service state.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Peer returned a non-2xx status.
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    /// Request exceeded the configured deadline.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
