//! Wires the local source, one poller per remote zone and the aggregator.

use meshsync_client::{ClientConfig, ControlPlaneHttpClient};
use meshsync_types::error::ConfigError;
use meshsync_types::models::ControlPlaneConfig;
use std::sync::Arc;
use tracing::info;

use super::aggregator::{MultiZoneStream, StateAggregator};
use super::local::LocalZoneStateChanges;
use super::metrics::describe_sync_metrics;
use super::poller::{RemoteZonePoller, RemoteZoneStateChanges, RemoteZones};
use super::source::{ControlPlaneClient, ControlPlaneInstanceFetcher, ZoneStateChanges};
use crate::error::CoreResult;
use crate::routing::TagCombinationResolver;

pub struct SyncEngine {
    config: ControlPlaneConfig,
    local: LocalZoneStateChanges,
    fetcher: Arc<dyn ControlPlaneInstanceFetcher>,
    client: Arc<dyn ControlPlaneClient>,
    remote_zones: Vec<String>,
}

impl SyncEngine {
    /// Validate the configuration and plan one poller per remote zone.
    ///
    /// `known_zones` is every zone discovery knows about; the local zone and
    /// blacklisted zones are filtered out. With sync disabled no zone is polled.
    pub fn new<I, S>(
        config: ControlPlaneConfig,
        local: LocalZoneStateChanges,
        fetcher: Arc<dyn ControlPlaneInstanceFetcher>,
        client: Arc<dyn ControlPlaneClient>,
        known_zones: I,
    ) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        config.check()?;
        // compiles every routing pattern so a malformed one stops startup here
        TagCombinationResolver::new(&config.service_tags)?;
        if local.zone() != config.local_zone {
            return Err(ConfigError::validation(
                "local_zone",
                format!(
                    "local source reports zone '{}' but config says '{}'",
                    local.zone(),
                    config.local_zone
                ),
            )
            .into());
        }

        let remote_zones = if config.sync.enabled {
            RemoteZones::resolve(known_zones, &config.local_zone, &config.sync.blacklisted_remote_zones)
        } else {
            Vec::new()
        };

        Ok(Self { config, local, fetcher, client, remote_zones })
    }

    /// Same as [`SyncEngine::new`] with the reqwest peer client built from `config.sync`.
    pub fn with_http_client<I, S>(
        config: ControlPlaneConfig,
        local: LocalZoneStateChanges,
        fetcher: Arc<dyn ControlPlaneInstanceFetcher>,
        known_zones: I,
    ) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = ControlPlaneHttpClient::new(ClientConfig::from(&config.sync))?;
        Self::new(config, local, fetcher, Arc::new(client), known_zones)
    }

    pub fn remote_zones(&self) -> &[String] {
        &self.remote_zones
    }

    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    /// Start every poller and the aggregator. Must be called inside a tokio runtime.
    pub fn start(self) -> MultiZoneStream {
        describe_sync_metrics();

        let mut sources = Vec::with_capacity(self.remote_zones.len() + 1);
        sources.push(self.local.into_source());

        for zone in &self.remote_zones {
            let poller = RemoteZonePoller::new(
                zone.as_str(),
                &self.config.sync,
                Arc::clone(&self.fetcher),
                Arc::clone(&self.client),
            );
            sources.push(RemoteZoneStateChanges::new(poller).into_source());
        }

        info!(
            "[Sync] ✅ Sync engine started (local: {}, remote: {:?})",
            self.config.local_zone, self.remote_zones
        );

        StateAggregator::new(self.config.sync.aggregation_mode).combine(sources)
    }
}
