//! Service instances and per-zone service state.
//!
//! Wire format matches what peer control planes serve on `/state`:
//!
//! ```json
//! {"serviceNameToInstances": {"echo": {"serviceName": "echo", "instances": [
//!     {"id": "echo-1", "tags": ["canary"], "address": "10.0.0.1", "port": 8080}
//! ]}}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type ServiceName = String;

/// A single running instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    /// Opaque id, unique within a service
    pub id: String,
    /// Free-form instance tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub address: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub regular: bool,
    #[serde(default)]
    pub canary: bool,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

const fn default_true() -> bool {
    true
}

const fn default_weight() -> u32 {
    1
}

impl ServiceInstance {
    /// Regular, non-canary instance with weight 1.
    pub fn new<I, T>(id: impl Into<String>, address: impl Into<String>, port: u16, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            address: address.into(),
            port,
            regular: true,
            canary: false,
            weight: 1,
        }
    }

    pub fn with_canary(mut self, canary: bool) -> Self {
        self.canary = canary;
        self
    }

    pub fn with_regular(mut self, regular: bool) -> Self {
        self.regular = regular;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// All known instances of one service.
///
/// Holds at most one instance per id; instances are kept ordered by id so
/// structural equality does not depend on discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawServiceInstances")]
pub struct ServiceInstances {
    pub service_name: ServiceName,
    instances: Vec<ServiceInstance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServiceInstances {
    service_name: ServiceName,
    #[serde(default)]
    instances: Vec<ServiceInstance>,
}

impl From<RawServiceInstances> for ServiceInstances {
    fn from(raw: RawServiceInstances) -> Self {
        Self::new(raw.service_name, raw.instances)
    }
}

impl ServiceInstances {
    /// Build a set, keeping the last instance seen for each id.
    pub fn new(
        service_name: impl Into<ServiceName>,
        instances: impl IntoIterator<Item = ServiceInstance>,
    ) -> Self {
        let by_id: BTreeMap<String, ServiceInstance> =
            instances.into_iter().map(|instance| (instance.id.clone(), instance)).collect();
        Self { service_name: service_name.into(), instances: by_id.into_values().collect() }
    }

    /// Known service with zero instances.
    pub fn empty(service_name: impl Into<ServiceName>) -> Self {
        Self { service_name: service_name.into(), instances: Vec::new() }
    }

    pub fn instances(&self) -> &[ServiceInstance] {
        &self.instances
    }

    pub fn get(&self, id: &str) -> Option<&ServiceInstance> {
        self.instances
            .binary_search_by(|instance| instance.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.instances[idx])
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drop instances registered without an address.
    ///
    /// Returns `self` untouched when every instance has one.
    pub fn without_empty_address_instances(self) -> Self {
        if self.instances.iter().all(|i| !i.address.trim().is_empty()) {
            return self;
        }
        let instances = self.instances.into_iter().filter(|i| !i.address.trim().is_empty());
        Self::new(self.service_name, instances)
    }
}

/// Service name → instances for one zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesState {
    #[serde(default)]
    service_name_to_instances: BTreeMap<ServiceName, ServiceInstances>,
}

impl ServicesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service_name: &str) -> Option<&ServiceInstances> {
        self.service_name_to_instances.get(service_name)
    }

    pub fn has_service(&self, service_name: &str) -> bool {
        self.service_name_to_instances.contains_key(service_name)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &ServiceName> {
        self.service_name_to_instances.keys()
    }

    pub fn all_instances(&self) -> impl Iterator<Item = &ServiceInstances> {
        self.service_name_to_instances.values()
    }

    pub fn len(&self) -> usize {
        self.service_name_to_instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.service_name_to_instances.is_empty()
    }

    /// Register a service with no instances. Returns false if already known.
    pub fn add(&mut self, service_name: impl Into<ServiceName>) -> bool {
        let service_name = service_name.into();
        if self.has_service(&service_name) {
            return false;
        }
        self.change(ServiceInstances::empty(service_name))
    }

    /// Replace a service's instances. Returns false if nothing changed.
    pub fn change(&mut self, service_instances: ServiceInstances) -> bool {
        if self.service_name_to_instances.get(&service_instances.service_name)
            == Some(&service_instances)
        {
            return false;
        }
        self.service_name_to_instances
            .insert(service_instances.service_name.clone(), service_instances);
        true
    }

    pub fn remove(&mut self, service_name: &str) -> bool {
        self.service_name_to_instances.remove(service_name).is_some()
    }

    pub fn remove_services_without_instances(mut self) -> Self {
        self.service_name_to_instances.retain(|_, instances| !instances.is_empty());
        self
    }
}

impl FromIterator<ServiceInstances> for ServicesState {
    fn from_iter<T: IntoIterator<Item = ServiceInstances>>(iter: T) -> Self {
        Self {
            service_name_to_instances: iter
                .into_iter()
                .map(|instances| (instances.service_name.clone(), instances))
                .collect(),
        }
    }
}
