//! Cross-zone synchronization configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use validator::Validate;

/// Strategy used to join zone streams.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Latest-value join with a read-ahead of one item per source
    #[default]
    CombineLatest,
    /// Like `CombineLatest`, plus most-recent-wins buffers before and after
    /// the join for consumers that apply their own backpressure
    LatestWins,
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::CombineLatest => write!(f, "combine_latest"),
            Self::LatestWins => write!(f, "latest_wins"),
        }
    }
}

/// Remote zone polling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct SyncConfig {
    /// Poll remote zones at all
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between two polls of the same zone
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
    /// TCP connect timeout for peer requests
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_ms: u64,
    /// Response read timeout for peer requests
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// How long a zone's last good state may be served after fetches start failing
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_cache_duration")]
    pub cache_duration_secs: u64,
    /// Service name peers register under in discovery
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_app_name")]
    pub control_plane_app_name: String,
    #[serde(default)]
    pub aggregation_mode: AggregationMode,
    /// Zones never polled even when discovery knows them
    #[serde(default)]
    pub blacklisted_remote_zones: BTreeSet<String>,
}

fn default_polling_interval() -> u64 {
    1
}

fn default_connection_timeout() -> u64 {
    1000
}

fn default_read_timeout() -> u64 {
    500
}

fn default_cache_duration() -> u64 {
    120
}

fn default_app_name() -> String {
    "envoy-control".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            polling_interval_secs: default_polling_interval(),
            connection_timeout_ms: default_connection_timeout(),
            read_timeout_ms: default_read_timeout(),
            cache_duration_secs: default_cache_duration(),
            control_plane_app_name: default_app_name(),
            aggregation_mode: AggregationMode::default(),
            blacklisted_remote_zones: BTreeSet::new(),
        }
    }
}

impl SyncConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    /// Deadline for one state fetch: connect plus read.
    pub fn request_timeout(&self) -> Duration {
        self.connection_timeout() + self.read_timeout()
    }
}
