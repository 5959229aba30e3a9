//! Per-client-group routing policy.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a client group wants its endpoints filtered by service tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPolicy {
    /// Automatic tag-based routing on/off
    #[serde(default)]
    pub auto_service_tag: bool,
    /// Preferred tags, most preferred first
    #[serde(default)]
    pub service_tag_preference: Vec<String>,
    /// Serve the unfiltered set when no preferred tag matches
    #[serde(default)]
    pub fallback_to_any_instance: bool,
}

impl RoutingPolicy {
    /// Policy that leaves endpoints untouched.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enabled policy; rejects an empty preference list.
    pub fn new(
        service_tag_preference: Vec<String>,
        fallback_to_any_instance: bool,
    ) -> Result<Self, ConfigError> {
        let policy =
            Self { auto_service_tag: true, service_tag_preference, fallback_to_any_instance };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_service_tag && self.service_tag_preference.is_empty() {
            return Err(ConfigError::validation(
                "serviceTagPreference",
                "autoServiceTag is enabled but no preferred tag is configured",
            ));
        }
        if self.service_tag_preference.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::validation(
                "serviceTagPreference",
                "preferred tags must not be blank",
            ));
        }
        Ok(())
    }
}
