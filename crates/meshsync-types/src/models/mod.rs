//! Core domain models for meshsync.
//!
//! This module contains the data structures shared by the sync engine, the
//! routing resolvers and the peer HTTP client.

mod config;
mod endpoints;
mod instance;
mod routing;
mod zone;

// Re-export all models
pub use config::{
    AggregationMode, CanaryConfig, ControlPlaneConfig, LoadBalancingConfig, ServiceTagsConfig,
    SyncConfig, TagsCombination, ZonePriorities,
};
pub use endpoints::{ClusterLoadAssignment, EndpointMetadata, LbEndpoint, LocalityLbEndpoints};
pub use instance::{ServiceInstance, ServiceInstances, ServiceName, ServicesState};
pub use routing::RoutingPolicy;
pub use zone::{Locality, MultiZoneState, ZoneState};
