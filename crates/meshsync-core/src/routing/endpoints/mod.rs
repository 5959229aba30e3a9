//! Per-service endpoint views and their per-client-group filtering.
//!
//! [`EndpointsFactory`] turns the combined zone state into one
//! `ClusterLoadAssignment` per service; [`EndpointSetResolver`] narrows such
//! a view down for one client group's routing policy.

mod factory;
mod resolver;


pub use factory::{EndpointsFactory, LB_METADATA_NAMESPACE};
pub use resolver::EndpointSetResolver;
