//! Top-level control plane configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::load_balancing::LoadBalancingConfig;
use super::service_tags::ServiceTagsConfig;
use super::sync::SyncConfig;
use crate::error::ConfigError;

/// Full control plane configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ControlPlaneConfig {
    /// Name of the zone this instance runs in
    #[validate(length(min = 1_u64))]
    pub local_zone: String,
    /// Remote zone polling
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,
    /// Routable tag derivation and tag-preference routing
    #[serde(default)]
    #[validate(nested)]
    pub service_tags: ServiceTagsConfig,
    /// Endpoint metadata, weights and locality priorities
    #[serde(default)]
    #[validate(nested)]
    pub load_balancing: LoadBalancingConfig,
}

impl ControlPlaneConfig {
    pub fn new(local_zone: impl Into<String>) -> Self {
        Self {
            local_zone: local_zone.into(),
            sync: SyncConfig::default(),
            service_tags: ServiceTagsConfig::default(),
            load_balancing: LoadBalancingConfig::default(),
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::from_json_error(&e))?;
        config.check()?;
        Ok(config)
    }

    /// Field-level validation plus the cross-field rules derives cannot express.
    ///
    /// Regex syntax of tag patterns is checked where they get compiled.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::validation("config", e.to_string()))?;

        if self.sync.blacklisted_remote_zones.contains(&self.local_zone) {
            return Err(ConfigError::validation(
                "sync.blacklisted_remote_zones",
                format!("local zone '{}' cannot be blacklisted", self.local_zone),
            ));
        }

        for combination in &self.service_tags.allowed_tags_combinations {
            if !(2..=3).contains(&combination.tags.len()) {
                return Err(ConfigError::validation(
                    "service_tags.allowed_tags_combinations",
                    format!(
                        "combination for service '{}' has {} tags, expected 2 or 3",
                        combination.service_name,
                        combination.tags.len()
                    ),
                ));
            }
        }

        Ok(())
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self::new("local")
    }
}
