//! Tag-based routing over the synchronized state.
//!
//! - **`tags`** - expands instance tags into routable combinations
//! - **`endpoints`** - per-service endpoint views and per-client filtering

pub mod endpoints;
pub mod tags;

pub use endpoints::{EndpointSetResolver, EndpointsFactory};
pub use tags::{RoutableTags, TagCombinationResolver};
