//! Load-balancing configuration for generated endpoint views.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct CanaryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_canary_key")]
    pub metadata_key: String,
    #[serde(default = "default_canary_value")]
    pub header_value: String,
}

fn default_canary_key() -> String {
    "canary".to_string()
}

fn default_canary_value() -> String {
    "1".to_string()
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            metadata_key: default_canary_key(),
            header_value: default_canary_value(),
        }
    }
}

/// current zone → (target zone → priority)
pub type ZonePriorities = BTreeMap<String, BTreeMap<String, u32>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct LoadBalancingConfig {
    /// Publish instance weights as LB weights
    #[serde(default)]
    pub weights_enabled: bool,
    #[validate(nested)]
    #[serde(default)]
    pub canary: CanaryConfig,
    #[serde(default = "default_regular_key")]
    pub regular_metadata_key: String,
    /// Explicit locality priorities; empty means local=0, remote=1
    #[serde(default)]
    pub zone_priorities: ZonePriorities,
}

fn default_regular_key() -> String {
    "lb_regular".to_string()
}

impl Default for LoadBalancingConfig {
    fn default() -> Self {
        Self {
            weights_enabled: false,
            canary: CanaryConfig::default(),
            regular_metadata_key: default_regular_key(),
            zone_priorities: ZonePriorities::new(),
        }
    }
}
