//! Per-service endpoint views handed to proxy configuration builders.
//!
//! Endpoints and localities are reference counted so filtering can hand back
//! the very same allocations when nothing changes (`Arc::ptr_eq` holds).

use serde::Serialize;
use std::sync::Arc;

/// Load-balancing metadata of one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointMetadata {
    /// Canary marker value, when canary load balancing is on
    pub canary: Option<String>,
    pub regular: bool,
    /// Routable tags; `None` when the instance carries none
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LbEndpoint {
    pub address: String,
    pub port: u16,
    pub metadata: EndpointMetadata,
    pub load_balancing_weight: Option<u32>,
}

impl LbEndpoint {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.as_ref().is_some_and(|tags| tags.iter().any(|t| t == tag))
    }
}

/// Endpoints of one service within one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalityLbEndpoints {
    pub zone: String,
    pub priority: u32,
    pub lb_endpoints: Arc<Vec<Arc<LbEndpoint>>>,
}

impl LocalityLbEndpoints {
    pub fn new(zone: impl Into<String>, priority: u32, lb_endpoints: Vec<Arc<LbEndpoint>>) -> Self {
        Self { zone: zone.into(), priority, lb_endpoints: Arc::new(lb_endpoints) }
    }

    /// Same zone and priority, different endpoint list.
    pub fn with_endpoints(&self, lb_endpoints: Vec<Arc<LbEndpoint>>) -> Self {
        Self { zone: self.zone.clone(), priority: self.priority, lb_endpoints: Arc::new(lb_endpoints) }
    }

    pub fn is_empty(&self) -> bool {
        self.lb_endpoints.is_empty()
    }
}

/// Multi-zone endpoint view of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterLoadAssignment {
    pub cluster_name: String,
    pub endpoints: Vec<Arc<LocalityLbEndpoints>>,
}

impl ClusterLoadAssignment {
    pub fn new(cluster_name: impl Into<String>, endpoints: Vec<Arc<LocalityLbEndpoints>>) -> Self {
        Self { cluster_name: cluster_name.into(), endpoints }
    }

    pub fn locality(&self, zone: &str) -> Option<&Arc<LocalityLbEndpoints>> {
        self.endpoints.iter().find(|l| l.zone == zone)
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.iter().map(|l| l.lb_endpoints.len()).sum()
    }
}
