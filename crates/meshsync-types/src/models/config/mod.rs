//! Control plane configuration models.

mod control_plane;
mod load_balancing;
mod service_tags;
mod sync;

pub use control_plane::ControlPlaneConfig;
pub use load_balancing::{CanaryConfig, LoadBalancingConfig, ZonePriorities};
pub use service_tags::{ServiceTagsConfig, TagsCombination};
pub use sync::{AggregationMode, SyncConfig};
