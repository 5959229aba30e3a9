//! # meshsync Types
//!
//! Core types, models, and error definitions for meshsync.
//!
//! This crate provides the foundational type system for the workspace:
//!
//! - **`error`** - Typed error hierarchy for configuration and synchronization
//! - **`models`** - Domain models (service state, zone snapshots, endpoint views, config)
//!
//! ## Architecture Role
//!
//! `meshsync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          meshsync-types (this crate)
//!                 │
//!        ┌────────┴────────┐
//!        ▼                 ▼
//! meshsync-client    meshsync-core
//!        │                 ▲
//!        └─────────────────┘
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for the peer `/state` API
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for change detection and testing

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, SyncError};

// Re-export core model types
pub use models::{
    ClusterLoadAssignment, ControlPlaneConfig, LbEndpoint, LocalityLbEndpoints, MultiZoneState,
    RoutingPolicy, ServiceInstance, ServiceInstances, ServicesState, ZoneState,
};
