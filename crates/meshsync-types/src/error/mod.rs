//! Error types shared by the sync engine and the routing resolvers.
//!
//! Configuration errors stop startup; sync errors are recovered where they
//! happen and only reach logs and metrics.

mod config;
mod sync;

pub use config::ConfigError;
pub use sync::SyncError;
