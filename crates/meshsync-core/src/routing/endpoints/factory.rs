use meshsync_types::error::ConfigError;
use meshsync_types::models::{
    ClusterLoadAssignment, ControlPlaneConfig, EndpointMetadata, LbEndpoint, LoadBalancingConfig,
    Locality, LocalityLbEndpoints, MultiZoneState, ServiceInstance, ServiceTagsConfig, ZoneState,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::routing::tags::TagCombinationResolver;

/// Filter metadata namespace the load balancer reads subset keys from.
pub const LB_METADATA_NAMESPACE: &str = "envoy.lb";

/// Groups the combined multi-zone state into per-service endpoint views.
#[derive(Debug)]
pub struct EndpointsFactory {
    current_zone: String,
    load_balancing: LoadBalancingConfig,
    service_tags: ServiceTagsConfig,
    tags: TagCombinationResolver,
}

impl EndpointsFactory {
    pub fn new(config: &ControlPlaneConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            current_zone: config.local_zone.clone(),
            load_balancing: config.load_balancing.clone(),
            service_tags: config.service_tags.clone(),
            tags: TagCombinationResolver::new(&config.service_tags)?,
        })
    }

    /// One view per service in `services`, with a locality for every zone
    /// that knows the service.
    ///
    /// Zones are visited in `state` order so the locality order is stable.
    pub fn create_load_assignment<'s, I>(
        &self,
        services: I,
        state: &MultiZoneState,
    ) -> Vec<Arc<ClusterLoadAssignment>>
    where
        I: IntoIterator<Item = &'s str>,
    {
        services
            .into_iter()
            .map(|service| {
                let localities: Vec<Arc<LocalityLbEndpoints>> = state
                    .iter()
                    .filter_map(|zone| self.locality(service, zone))
                    .map(Arc::new)
                    .collect();
                debug!(
                    service = %service,
                    "[Endpoints] {} localities built from {} zones",
                    localities.len(),
                    state.len()
                );
                Arc::new(ClusterLoadAssignment::new(service, localities))
            })
            .collect()
    }

    fn locality(&self, service: &str, zone: &ZoneState) -> Option<LocalityLbEndpoints> {
        let instances = zone.services_state.get(service)?;
        let endpoints = instances
            .instances()
            .iter()
            .map(|instance| Arc::new(self.endpoint(service, instance)))
            .collect();
        Some(LocalityLbEndpoints::new(zone.zone.clone(), self.priority(zone), endpoints))
    }

    fn endpoint(&self, service: &str, instance: &ServiceInstance) -> LbEndpoint {
        let canary = self.load_balancing.canary.enabled && instance.canary;
        let tags = if self.service_tags.enabled {
            self.tags
                .routable_tags(service, instance.tags.iter().map(String::as_str))
                .map(Iterator::collect)
        } else {
            None
        };

        LbEndpoint {
            address: instance.address.clone(),
            port: instance.port,
            metadata: EndpointMetadata {
                canary: canary.then(|| self.load_balancing.canary.header_value.clone()),
                regular: instance.regular,
                tags,
            },
            load_balancing_weight: self.load_balancing.weights_enabled.then_some(instance.weight),
        }
    }

    /// Priority of `zone` as seen from the zone running this control plane.
    ///
    /// An explicit entry in the current zone's priority table wins; zones it
    /// does not mention (or an absent or empty table) get `0` when local and
    /// `1` otherwise.
    pub fn priority(&self, zone: &ZoneState) -> u32 {
        self.load_balancing
            .zone_priorities
            .get(&self.current_zone)
            .filter(|table| !table.is_empty())
            .and_then(|table| table.get(&zone.zone))
            .copied()
            .unwrap_or(match zone.locality {
                Locality::Local => 0,
                Locality::Remote => 1,
            })
    }

    /// Endpoint metadata keyed by the configured metadata keys, under
    /// [`LB_METADATA_NAMESPACE`].
    pub fn filter_metadata(&self, endpoint: &LbEndpoint) -> Map<String, Value> {
        let mut lb = Map::new();
        if let Some(canary) = &endpoint.metadata.canary {
            lb.insert(self.load_balancing.canary.metadata_key.clone(), Value::from(canary.clone()));
        }
        if endpoint.metadata.regular {
            lb.insert(self.load_balancing.regular_metadata_key.clone(), Value::Bool(true));
        }
        if let Some(tags) = &endpoint.metadata.tags {
            lb.insert(self.service_tags.metadata_key.clone(), Value::from(tags.clone()));
        }

        let mut metadata = Map::new();
        metadata.insert(LB_METADATA_NAMESPACE.to_string(), Value::Object(lb));
        metadata
    }
}
