//! # Meshsync Core
//!
//! Cross-zone state synchronization and tag routing for a service-mesh
//! control plane.
//!
//! ## Architecture
//!
//! ```text
//! meshsync-core/src/
//! ├── sync/
//! │   ├── poller/       # one polling loop per remote zone, last-good fallback
//! │   ├── local.rs      # local zone source (discovery watch)
//! │   ├── aggregator/   # joins all sources into one deduplicated stream
//! │   └── engine.rs     # wiring from ControlPlaneConfig
//! ├── routing/
//! │   ├── tags.rs       # routable tag combinations per instance
//! │   └── endpoints/    # per-service views + per-client tag filtering
//! ├── api.rs            # GET /state for peer control planes
//! └── logging.rs        # tracing subscriber setup
//! ```
//!
//! Configuration errors surface at construction; everything past that point
//! recovers locally and is reported through `tracing` and `metrics`.

#![allow(clippy::module_name_repetitions, reason = "Types are re-exported at the crate root")]
#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards in async code require careful lifetime management"
)]
#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
#![allow(clippy::needless_continue, reason = "Explicit continue improves loop readability")]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::needless_collect,
        clippy::assertions_on_result_states
    )
)]

pub mod api;
pub mod error;
pub mod logging;
pub mod routing;
pub mod sync;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use routing::{EndpointSetResolver, EndpointsFactory, RoutableTags, TagCombinationResolver};
pub use sync::{
    LocalZoneStateChanges, MultiZoneStream, RemoteZonePoller, StateAggregator, SyncEngine,
};
