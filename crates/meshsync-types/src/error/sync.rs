//! Synchronization errors.
//!
//! Every variant here is recovered locally by the component that produced it:
//! logged, counted, and never propagated to consumers of the combined stream.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while polling remote zones or combining zone streams.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum SyncError {
    /// Peer control-plane instances for a zone could not be resolved
    #[error("Failed fetching instances from {zone}: {message}")]
    InstanceResolution { zone: String, message: String },

    /// Fetching state from a peer failed (network, non-2xx, bad body)
    #[error("Error synchronizing state of {zone} from {uri}: {message}")]
    StateFetch { zone: String, uri: String, message: String },

    /// Fetching state from a peer exceeded its deadline
    #[error("State fetch for {zone} timed out after {timeout_ms}ms")]
    Timeout { zone: String, timeout_ms: u64 },

    /// A single aggregator source produced an error
    #[error("Source {source_name} failed: {message}")]
    SourceFault { source_name: String, message: String },
}

impl SyncError {
    /// Zone the error belongs to, if it is zone-scoped.
    pub fn zone(&self) -> Option<&str> {
        match self {
            Self::InstanceResolution { zone, .. }
            | Self::StateFetch { zone, .. }
            | Self::Timeout { zone, .. } => Some(zone),
            Self::SourceFault { .. } => None,
        }
    }

    /// Zone-level failures heal on a later poll; source faults need a restart of the source.
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::SourceFault { .. })
    }

    /// Metric `operation` label for the failure site.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::InstanceResolution { .. } => "get-instances",
            Self::StateFetch { .. } | Self::Timeout { .. } => "get-state",
            Self::SourceFault { .. } => "combine",
        }
    }
}
