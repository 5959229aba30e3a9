//! Service tag routing configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// An allowed combination of 2 or 3 tag patterns for one service.
///
/// Each element is a regular expression matched against the whole tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagsCombination {
    pub service_name: String,
    pub tags: Vec<String>,
}

impl TagsCombination {
    pub fn new<I, T>(service_name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self { service_name: service_name.into(), tags: tags.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Configuration struct - bools are intentional feature flags"
)]
pub struct ServiceTagsConfig {
    /// Attach routable tags to endpoint metadata
    #[serde(default)]
    pub enabled: bool,
    /// Filter endpoints by client tag preference
    #[serde(default)]
    pub auto_service_tag_enabled: bool,
    /// Metadata key the tags are published under
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_metadata_key")]
    pub metadata_key: String,
    /// Tags never used for routing (regexes, matched against the whole tag)
    #[serde(default)]
    pub routing_excluded_tags: Vec<String>,
    #[serde(default)]
    pub allowed_tags_combinations: Vec<TagsCombination>,
}

fn default_metadata_key() -> String {
    "tag".to_string()
}

impl Default for ServiceTagsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_service_tag_enabled: false,
            metadata_key: default_metadata_key(),
            routing_excluded_tags: Vec::new(),
            allowed_tags_combinations: Vec::new(),
        }
    }
}

impl ServiceTagsConfig {
    /// Whether endpoint filtering by tag preference is switched on globally.
    pub fn is_auto_routing_enabled(&self) -> bool {
        self.enabled && self.auto_service_tag_enabled
    }
}
