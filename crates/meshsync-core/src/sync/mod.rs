//! Cross-zone state synchronization.
//!
//! - **`poller`** - one polling loop per remote zone, with last-good-state fallback
//! - **`local`** - local zone source fed by the discovery watch
//! - **`aggregator`** - joins every source into one deduplicated stream
//! - **`engine`** - wiring from configuration
//! - **`metrics`** - counter names and recording helpers

pub mod aggregator;
pub mod engine;
pub mod latest;
pub mod local;
pub mod metrics;
pub mod poller;
pub mod source;
mod task;

pub use aggregator::{MultiZoneStream, StateAggregator};
pub use engine::SyncEngine;
pub use local::LocalZoneStateChanges;
pub use poller::{RemoteZonePoller, RemoteZoneStateChanges, RemoteZones, ZoneStateStream};
pub use source::{
    BoxError, ControlPlaneClient, ControlPlaneInstanceFetcher, SourceItem, StaticInstanceFetcher,
    ZoneSource, ZoneStateChanges,
};
